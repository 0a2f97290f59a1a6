//! Machine templates
//!
//! TigerStyle: Builder pattern with validation assertions.
//!
//! A template is the read-only machine spec supplied by the configuration
//! layer: image, flavor, login credentials and per-template options.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use stratus_core::constants::MACHINE_NAME_LENGTH_BYTES_MAX;
use stratus_core::error::{Error, Result};

/// User-supplied machine spec
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MachineTemplate {
    /// Image id to boot from
    pub image_id: String,

    /// Hardware flavor id
    pub flavor_id: String,

    /// Key pair injected into the machine
    pub key_pair: String,

    /// Security group applied to the machine
    pub security_group: String,

    /// Login user for the provisioned machine
    pub remote_username: String,

    /// Login password for the provisioned machine
    pub remote_password: String,

    /// Directory on the machine where the agent payload is installed
    pub remote_directory: String,

    /// Per-template override of the configured machine name prefix
    #[serde(default)]
    pub name_prefix: Option<String>,

    /// Additional provider-specific options
    #[serde(default)]
    pub options: HashMap<String, String>,
}

impl MachineTemplate {
    /// Create a new builder
    pub fn builder() -> MachineTemplateBuilder {
        MachineTemplateBuilder::default()
    }

    /// Validate the template
    pub fn validate(&self) -> Result<()> {
        for (field, value) in [
            ("image_id", &self.image_id),
            ("flavor_id", &self.flavor_id),
            ("key_pair", &self.key_pair),
            ("security_group", &self.security_group),
        ] {
            if value.is_empty() {
                return Err(Error::InvalidConfiguration {
                    field: format!("template.{}", field),
                    reason: "must be set".into(),
                });
            }
        }

        if let Some(prefix) = &self.name_prefix {
            if prefix.is_empty() {
                return Err(Error::InvalidConfiguration {
                    field: "template.name_prefix".into(),
                    reason: "must not be empty when set".into(),
                });
            }
            if prefix.len() > MACHINE_NAME_LENGTH_BYTES_MAX / 2 {
                return Err(Error::InvalidConfiguration {
                    field: "template.name_prefix".into(),
                    reason: format!(
                        "length {} exceeds limit {}",
                        prefix.len(),
                        MACHINE_NAME_LENGTH_BYTES_MAX / 2
                    ),
                });
            }
        }

        Ok(())
    }

    /// Look up a provider-specific option
    pub fn option(&self, key: &str) -> Option<&str> {
        self.options.get(key).map(String::as_str)
    }
}

/// Builder for [`MachineTemplate`]
#[derive(Debug, Default)]
pub struct MachineTemplateBuilder {
    image_id: Option<String>,
    flavor_id: Option<String>,
    key_pair: Option<String>,
    security_group: Option<String>,
    remote_username: Option<String>,
    remote_password: Option<String>,
    remote_directory: Option<String>,
    name_prefix: Option<String>,
    options: HashMap<String, String>,
}

impl MachineTemplateBuilder {
    /// Set the image id
    pub fn image(mut self, id: impl Into<String>) -> Self {
        self.image_id = Some(id.into());
        self
    }

    /// Set the hardware flavor id
    pub fn flavor(mut self, id: impl Into<String>) -> Self {
        self.flavor_id = Some(id.into());
        self
    }

    /// Set the key pair
    pub fn key_pair(mut self, name: impl Into<String>) -> Self {
        self.key_pair = Some(name.into());
        self
    }

    /// Set the security group
    pub fn security_group(mut self, name: impl Into<String>) -> Self {
        self.security_group = Some(name.into());
        self
    }

    /// Set the remote login user
    pub fn remote_username(mut self, name: impl Into<String>) -> Self {
        self.remote_username = Some(name.into());
        self
    }

    /// Set the remote login password
    pub fn remote_password(mut self, password: impl Into<String>) -> Self {
        self.remote_password = Some(password.into());
        self
    }

    /// Set the remote install directory
    pub fn remote_directory(mut self, dir: impl Into<String>) -> Self {
        self.remote_directory = Some(dir.into());
        self
    }

    /// Override the configured machine name prefix for this template
    pub fn name_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.name_prefix = Some(prefix.into());
        self
    }

    /// Add a provider-specific option
    pub fn option(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.options.insert(key.into(), value.into());
        self
    }

    /// Build the template, validating all values
    pub fn build(self) -> Result<MachineTemplate> {
        let template = MachineTemplate {
            image_id: self.image_id.unwrap_or_default(),
            flavor_id: self.flavor_id.unwrap_or_default(),
            key_pair: self.key_pair.unwrap_or_default(),
            security_group: self.security_group.unwrap_or_default(),
            remote_username: self.remote_username.unwrap_or_default(),
            remote_password: self.remote_password.unwrap_or_default(),
            remote_directory: self.remote_directory.unwrap_or_default(),
            name_prefix: self.name_prefix,
            options: self.options,
        };

        template.validate()?;
        Ok(template)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_builder() -> MachineTemplateBuilder {
        MachineTemplate::builder()
            .image("img-1")
            .flavor("m1.small")
            .key_pair("ops-key")
            .security_group("default")
    }

    #[test]
    fn test_template_builder_full() {
        let template = minimal_builder()
            .remote_username("ubuntu")
            .remote_password("secret")
            .remote_directory("/opt/agent")
            .name_prefix("web-")
            .option("availability_zone", "az1")
            .build()
            .unwrap();

        assert_eq!(template.image_id, "img-1");
        assert_eq!(template.flavor_id, "m1.small");
        assert_eq!(template.name_prefix.as_deref(), Some("web-"));
        assert_eq!(template.option("availability_zone"), Some("az1"));
        assert_eq!(template.option("missing"), None);
    }

    #[test]
    fn test_template_requires_image() {
        let result = MachineTemplate::builder()
            .flavor("m1.small")
            .key_pair("ops-key")
            .security_group("default")
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn test_template_requires_security_group() {
        let result = MachineTemplate::builder()
            .image("img-1")
            .flavor("m1.small")
            .key_pair("ops-key")
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn test_template_rejects_empty_prefix_override() {
        let result = minimal_builder().name_prefix("").build();
        assert!(result.is_err());
    }

    #[test]
    fn test_template_roundtrips_through_serde() {
        let template = minimal_builder().build().unwrap();
        let json = serde_json::to_string(&template).unwrap();
        let back: MachineTemplate = serde_json::from_str(&json).unwrap();
        assert_eq!(back.image_id, template.image_id);
        assert_eq!(back.security_group, template.security_group);
    }
}
