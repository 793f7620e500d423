//! Configuration rows as an ordered child collection

use super::mapper::{decode_payload, payload_text};
use super::{Configuration, ConfigurationRow, config_key};
use crate::remote::{Api, ConfigRow};
use declarative::{ChildCollection, Field, RemoteResult, TranslationError};
use std::collections::HashSet;

#[derive(Debug, Default)]
pub struct RowCollection {
    pretty: bool,
}

impl RowCollection {
    pub fn new(pretty: bool) -> Self {
        Self { pretty }
    }
}

impl ChildCollection for RowCollection {
    type Parent = Configuration;
    type Child = ConfigurationRow;
    type Remote = ConfigRow;
    type Client = Api;

    fn collection<'p>(&self, parent: &'p Configuration) -> &'p Field<Vec<ConfigurationRow>> {
        &parent.rows
    }

    fn collection_mut<'p>(
        &self,
        parent: &'p mut Configuration,
    ) -> &'p mut Field<Vec<ConfigurationRow>> {
        &mut parent.rows
    }

    fn child_id<'c>(&self, child: &'c ConfigurationRow) -> Option<&'c str> {
        child
            .id
            .as_known()
            .map(String::as_str)
            .filter(|id| !id.is_empty())
    }

    fn remote_id(&self, remote: &ConfigRow) -> String {
        remote.id.clone().unwrap_or_default()
    }

    fn materialize_child(&self, child: &ConfigurationRow) -> Result<ConfigRow, TranslationError> {
        Ok(ConfigRow {
            id: self.child_id(child).map(str::to_string),
            name: child.name.value(),
            description: child.description.value(),
            change_description: child.change_description.value(),
            is_disabled: child.is_disabled.value(),
            version: 0,
            state: decode_payload("state", &child.state)?,
            content: decode_payload("configuration_row", &child.configuration_row)?,
        })
    }

    fn hydrate_child(&self, remote: &ConfigRow) -> ConfigurationRow {
        ConfigurationRow {
            id: remote.id.clone().into(),
            name: Field::Known(remote.name.clone()),
            description: Field::Known(remote.description.clone()),
            change_description: Field::Known(remote.change_description.clone()),
            is_disabled: Field::Known(remote.is_disabled),
            version: Field::Known(remote.version),
            state: Field::Known(payload_text(&remote.state, self.pretty)),
            configuration_row: Field::Known(payload_text(&remote.content, self.pretty)),
        }
    }

    /// Delete rows missing from `children`, update the rest, create new ones
    fn replace(
        &self,
        client: &Api,
        parent: &Configuration,
        children: Vec<ConfigRow>,
        sort_order: &[String],
    ) -> RemoteResult<()> {
        let key = config_key(parent)?;

        let wanted: HashSet<&str> = children.iter().filter_map(|c| c.id.as_deref()).collect();
        for existing in client.list_rows(&key)? {
            if let Some(id) = existing.id.as_deref()
                && !wanted.contains(id)
            {
                log::debug!("Deleting row {id} of {}", key.compound_id());
                client.delete_row(&key, id)?;
            }
        }

        for child in &children {
            if child.id.is_some() {
                client.update_row(&key, child)?;
            } else {
                let created = client.create_row(&key, child)?;
                log::debug!("Created row {:?} of {}", created.id, key.compound_id());
            }
        }

        if !sort_order.is_empty() {
            client.set_rows_sort_order(&key, sort_order)?;
        }
        Ok(())
    }

    fn list(&self, client: &Api, parent: &Configuration) -> RemoteResult<Vec<ConfigRow>> {
        client.list_rows(&config_key(parent)?)
    }
}
