//! Fleet fan-out and all-or-nothing rollback scenarios

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use stratus_compute::{ControlPlane, MachineTemplate, MockControlPlane, MockReadinessProbe};
use stratus_core::config::StratusConfig;
use stratus_core::error::Error;
use stratus_provision::Provisioner;

fn template() -> MachineTemplate {
    MachineTemplate::builder()
        .image("img-1")
        .flavor("m1.small")
        .key_pair("ops-key")
        .security_group("default")
        .remote_username("ubuntu")
        .remote_password("secret")
        .remote_directory("/opt/agent")
        .build()
        .unwrap()
}

fn fast_config() -> StratusConfig {
    let mut config = StratusConfig::default();
    config.provision.poll_interval_ms = 1;
    config
}

fn provisioner(mock: &Arc<MockControlPlane>) -> Provisioner {
    Provisioner::new(
        mock.clone(),
        Arc::new(MockReadinessProbe::ready()),
        template(),
        fast_config(),
    )
    .unwrap()
}

#[tokio::test]
async fn test_start_fleet_returns_distinct_ready_machines() {
    let mock = Arc::new(MockControlPlane::new());
    let provisioner = provisioner(&mock);

    let fleet = provisioner
        .start_fleet(3, Duration::from_secs(10))
        .await
        .unwrap();

    assert_eq!(fleet.len(), 3);
    let ids: HashSet<&str> = fleet.iter().map(|d| d.machine_id.as_str()).collect();
    assert_eq!(ids.len(), 3);
    for details in &fleet {
        assert!(!details.public_address.is_empty());
        assert!(!details.private_address.is_empty());
    }
    assert_eq!(mock.live_machine_count(), 3);
}

#[tokio::test]
async fn test_start_fleet_attach_failure_tears_everything_down() {
    // One of three workers loses its address attach; the fleet reports the
    // attach failure and no machine or address stays allocated.
    let mock = Arc::new(MockControlPlane::new());
    mock.set_fail_attach_on_call(Some(2));
    let provisioner = provisioner(&mock);

    let err = provisioner
        .start_fleet(3, Duration::from_secs(10))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::AllocationFailed { .. }));

    let cred = mock.authenticate().await.unwrap();
    let machines = mock.list_machines(&cred).await.unwrap();
    assert!(machines.is_empty());
    assert_eq!(mock.live_machine_count(), 0);
    assert_eq!(mock.held_address_count(), 0);
    // All three created machines received a delete
    assert_eq!(mock.deleted_ids().len(), 3);
}

#[tokio::test]
async fn test_start_fleet_create_failure_reports_first_error() {
    // Every create is rejected outright; the fleet reports the provider
    // error and there is nothing to tear down.
    let mock = Arc::new(MockControlPlane::new());
    mock.set_fail_create(Some(400));
    let provisioner = provisioner(&mock);

    let err = provisioner
        .start_fleet(2, Duration::from_secs(10))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Provider { status: 400, .. }));
    assert_eq!(mock.calls().delete, 0);
}

#[tokio::test]
async fn test_start_fleet_rejects_zero_count() {
    let mock = Arc::new(MockControlPlane::new());
    let provisioner = provisioner(&mock);

    let err = provisioner
        .start_fleet(0, Duration::from_secs(10))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InvalidConfiguration { .. }));
    assert_eq!(mock.calls().create, 0);
}
