//! Translation between [`Configuration`] snapshots and remote configs

use super::{CREATED_BY, Configuration, ConfigurationRow, UPDATED_BY};
use crate::remote::Config;
use content::OrderedMap;
use declarative::{Diagnostics, EntityMapper, Field, TranslationError};

#[derive(Debug, Default)]
pub struct ConfigurationMapper {
    pretty: bool,
}

impl ConfigurationMapper {
    pub fn new(pretty: bool) -> Self {
        Self { pretty }
    }
}

/// Payload text as stored in snapshots
pub(super) fn payload_text(map: &OrderedMap, pretty: bool) -> String {
    if pretty && !map.is_empty() {
        // Falls back to the compact form if the display encoder fails
        content::encode_display(map, "").unwrap_or_else(|_| content::encode(map))
    } else {
        content::encode(map)
    }
}

pub(super) fn decode_payload(
    field: &str,
    text: &Field<String>,
) -> Result<OrderedMap, TranslationError> {
    content::decode_or_empty(text.as_known().map(String::as_str))
        .map_err(|err| TranslationError::malformed(field, err))
}

/// Error out when an immutable identifier changes
fn check_immutable<T: PartialEq>(
    diagnostics: &mut Diagnostics,
    label: &str,
    desired: &Field<T>,
    persisted: &Field<T>,
) {
    if desired.is_known() && persisted.is_known() && desired != persisted {
        diagnostics.add_error(
            format!("Invalid {label}"),
            format!("Cannot change {label} after configuration is created"),
        );
    }
}

/// Audit comment for a write, depending on whether the entity exists yet
fn audit_comment(exists: bool) -> String {
    (if exists { UPDATED_BY } else { CREATED_BY }).to_string()
}

fn validate_row(row: &mut ConfigurationRow, index: usize, diagnostics: &mut Diagnostics) {
    let exists = row.id.as_known().is_some_and(|id| !id.is_empty());
    if row.change_description.is_absent() {
        row.change_description = Field::Known(audit_comment(exists));
    }
    row.configuration_row.default_with(|| content::EMPTY.to_string());
    row.state.default_with(|| content::EMPTY.to_string());

    for (label, text) in [
        ("configuration_row", &row.configuration_row),
        ("state", &row.state),
    ] {
        if let Err(err) = content::decode(text.as_str()) {
            diagnostics.add_error(
                "Invalid row payload",
                format!("Could not parse {label} of row {index}: {err}"),
            );
        }
    }
}

impl EntityMapper for ConfigurationMapper {
    type Local = Configuration;
    type Remote = Config;

    fn hydrate(&self, remote: &Config, local: &mut Configuration) -> Diagnostics {
        let mut diagnostics = Diagnostics::new();

        if let Some(key) = remote.key() {
            local.id = Field::Known(key.compound_id());
        }
        local.branch_id = remote.branch_id.into();
        local.component_id = Field::Known(remote.component_id.clone());
        local.configuration_id = remote.id.clone().into();
        local.name = Field::Known(remote.name.clone());
        local.description = Field::Known(remote.description.clone());
        local.change_description = Field::Known(remote.change_description.clone());
        local.is_disabled = Field::Known(remote.is_disabled);
        local.is_deleted = Field::Known(remote.is_deleted);
        local.version = Field::Known(remote.version);
        local.created = Field::Known(remote.created.clone());

        let remote_text = content::encode(&remote.content);
        let unchanged = local
            .configuration
            .as_known()
            .is_some_and(|text| content::equivalent(text, &remote_text));
        if !unchanged {
            if local.configuration.is_known() {
                diagnostics.add_warning(
                    "Remote configuration changed",
                    "The remote configuration differs from the local copy; refreshing local copy",
                );
            }
            local.configuration = Field::Known(payload_text(&remote.content, self.pretty));
        }

        diagnostics
    }

    fn materialize(
        &self,
        persisted: &Configuration,
        desired: &Configuration,
    ) -> Result<Config, TranslationError> {
        let branch_id = desired.branch_id.clone().or(persisted.branch_id.clone());
        let component_id = desired
            .component_id
            .clone()
            .or(persisted.component_id.clone());
        let id = desired
            .configuration_id
            .clone()
            .or(persisted.configuration_id.clone());

        Ok(Config {
            branch_id: branch_id.into_known(),
            component_id: component_id
                .into_known()
                .ok_or(TranslationError::MissingIdentifier("component_id"))?,
            id: id.into_known(),
            name: desired.name.value(),
            description: desired.description.value(),
            change_description: desired.change_description.value(),
            is_disabled: desired.is_disabled.value(),
            is_deleted: false,
            version: 0,
            created: String::new(),
            content: decode_payload("configuration", &desired.configuration)?,
        })
    }

    fn validate(
        &self,
        persisted: Option<&Configuration>,
        desired: &mut Configuration,
    ) -> Diagnostics {
        let mut diagnostics = Diagnostics::new();

        if desired.component_id.is_blank() {
            diagnostics.add_error(
                "Missing component ID",
                "A configuration needs a component_id",
            );
        }
        if desired.name.is_blank() {
            diagnostics.add_error("Missing name", "A configuration needs a name");
        }

        if let Some(persisted) = persisted {
            check_immutable(
                &mut diagnostics,
                "component_id",
                &desired.component_id,
                &persisted.component_id,
            );
            check_immutable(
                &mut diagnostics,
                "branch_id",
                &desired.branch_id,
                &persisted.branch_id,
            );
            check_immutable(
                &mut diagnostics,
                "configuration_id",
                &desired.configuration_id,
                &persisted.configuration_id,
            );
        }

        if desired.change_description.is_absent() {
            desired.change_description = Field::Known(audit_comment(persisted.is_some()));
        }

        desired
            .configuration
            .default_with(|| content::EMPTY.to_string());
        if let Err(err) = content::decode(desired.configuration.as_str()) {
            diagnostics.add_error(
                "Invalid configuration",
                format!("Could not parse configuration: {err}"),
            );
        }

        if desired.rows.is_absent() {
            // Keep the rows the remote already has
            desired.rows = match persisted {
                Some(persisted) => persisted.rows.clone().or(Field::Known(Vec::new())),
                None => Field::Known(Vec::new()),
            };
        }
        if let Field::Known(rows) = &mut desired.rows {
            for (index, row) in rows.iter_mut().enumerate() {
                validate_row(row, index, &mut diagnostics);
            }
        }

        diagnostics
    }
}
