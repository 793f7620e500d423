//! In-crate fixtures: a small "widget" kind with ordered "parts"

use crate::children::{ChildCollection, NestedCollection};
use crate::diagnostic::Diagnostics;
use crate::error::{RemoteError, RemoteResult, TranslationError};
use crate::field::Field;
use crate::lifecycle::EntityKind;
use crate::mapper::EntityMapper;
use std::sync::{Mutex, MutexGuard};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Widget {
    pub id: Field<String>,
    pub name: Field<String>,
    /// Immutable after creation
    pub family: Field<String>,
    /// Write-only, never returned by the remote
    pub secret: Field<String>,
    /// Computed by the remote
    pub note: Field<String>,
    pub parts: Field<Vec<Part>>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Part {
    pub id: Field<String>,
    pub label: Field<String>,
}

#[derive(Debug, Clone, Default)]
pub struct RemoteWidget {
    pub id: Option<String>,
    pub name: String,
    pub family: String,
    pub secret: String,
    pub note: String,
}

#[derive(Debug, Clone, Default)]
pub struct RemotePart {
    pub id: Option<String>,
    pub label: String,
}

#[derive(Debug, Default)]
struct FakeState {
    widget: Option<RemoteWidget>,
    parts: Vec<RemotePart>,
    next_part: usize,
    calls: Vec<String>,
    failing: Option<&'static str>,
    stateless: bool,
}

/// Remote stand-in recording every call
#[derive(Debug, Default)]
pub struct FakeClient {
    state: Mutex<FakeState>,
}

impl FakeClient {
    pub fn calls(&self) -> Vec<String> {
        self.lock().calls.clone()
    }

    /// Make the next call to `op` fail with a remote error
    pub fn fail_next(&self, op: &'static str) {
        self.lock().failing = Some(op);
    }

    /// Make read, update and delete answer with the sentinel
    pub fn go_stateless(&self) {
        self.lock().stateless = true;
    }

    pub fn rename_part(&self, index: usize, label: &str) {
        self.lock().parts[index].label = label.to_string();
    }

    fn lock(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().expect("fake client lock poisoned")
    }

    fn record(&self, op: &'static str) -> RemoteResult<MutexGuard<'_, FakeState>> {
        let mut state = self.lock();
        state.calls.push(op.to_string());

        if state.failing == Some(op) {
            state.failing = None;
            return Err(RemoteError::Status {
                status: 500,
                message: format!("injected {op} failure"),
            });
        }
        if state.stateless && matches!(op, "read" | "update" | "delete") {
            return Err(RemoteError::Stateless);
        }
        Ok(state)
    }
}

#[derive(Debug, Default)]
pub struct WidgetMapper;

impl EntityMapper for WidgetMapper {
    type Local = Widget;
    type Remote = RemoteWidget;

    fn hydrate(&self, remote: &RemoteWidget, local: &mut Widget) -> Diagnostics {
        local.id = remote.id.clone().into();
        local.name = Field::Known(remote.name.clone());
        local.family = Field::Known(remote.family.clone());
        local.note = Field::Known(remote.note.clone());
        Diagnostics::new()
    }

    fn materialize(
        &self,
        persisted: &Widget,
        desired: &Widget,
    ) -> Result<RemoteWidget, TranslationError> {
        Ok(RemoteWidget {
            id: desired.id.clone().or(persisted.id.clone()).into_known(),
            name: desired.name.as_str().to_string(),
            family: desired.family.as_str().to_string(),
            secret: desired.secret.as_str().to_string(),
            note: String::new(),
        })
    }

    fn validate(&self, persisted: Option<&Widget>, desired: &mut Widget) -> Diagnostics {
        let mut diagnostics = Diagnostics::new();
        if desired.name.is_blank() {
            diagnostics.add_error("Missing name", "A widget needs a name");
        }
        if let Some(persisted) = persisted
            && desired.family.is_known()
            && desired.family != persisted.family
        {
            diagnostics.add_error(
                "Invalid family",
                "Cannot change family after widget is created",
            );
        }
        diagnostics
    }

    fn carry_forward(&self, persisted: &Widget, desired: &mut Widget) {
        if desired.secret.is_absent() {
            desired.secret = persisted.secret.clone();
        }
    }
}

#[derive(Debug, Default)]
pub struct PartHandler;

impl ChildCollection for PartHandler {
    type Parent = Widget;
    type Child = Part;
    type Remote = RemotePart;
    type Client = FakeClient;

    fn collection<'p>(&self, parent: &'p Widget) -> &'p Field<Vec<Part>> {
        &parent.parts
    }

    fn collection_mut<'p>(&self, parent: &'p mut Widget) -> &'p mut Field<Vec<Part>> {
        &mut parent.parts
    }

    fn child_id<'c>(&self, child: &'c Part) -> Option<&'c str> {
        child.id.as_known().map(String::as_str)
    }

    fn remote_id(&self, remote: &RemotePart) -> String {
        remote.id.clone().unwrap_or_default()
    }

    fn materialize_child(&self, child: &Part) -> Result<RemotePart, TranslationError> {
        if child.label.is_blank() {
            return Err(TranslationError::Inconsistent("part label is required".into()));
        }
        Ok(RemotePart {
            id: child.id.as_known().cloned(),
            label: child.label.as_str().to_string(),
        })
    }

    fn hydrate_child(&self, remote: &RemotePart) -> Part {
        Part {
            id: remote.id.clone().into(),
            label: Field::Known(remote.label.clone()),
        }
    }

    fn replace(
        &self,
        client: &FakeClient,
        _parent: &Widget,
        children: Vec<RemotePart>,
        sort_order: &[String],
    ) -> RemoteResult<()> {
        let mut state = client.record("replace")?;

        let wanted: Vec<&str> = children.iter().filter_map(|c| c.id.as_deref()).collect();
        state
            .parts
            .retain(|p| p.id.as_deref().is_some_and(|id| wanted.contains(&id)));

        for child in children {
            match child.id.as_deref() {
                Some(id) => {
                    if let Some(existing) = state.parts.iter_mut().find(|p| p.id.as_deref() == Some(id)) {
                        existing.label = child.label;
                    }
                }
                None => {
                    state.next_part += 1;
                    let id = format!("p{}", state.next_part);
                    state.parts.push(RemotePart {
                        id: Some(id),
                        label: child.label,
                    });
                }
            }
        }

        if !sort_order.is_empty() {
            state.parts.sort_by_key(|p| {
                sort_order
                    .iter()
                    .position(|id| Some(id.as_str()) == p.id.as_deref())
                    .unwrap_or(usize::MAX)
            });
        }
        Ok(())
    }

    fn list(&self, client: &FakeClient, _parent: &Widget) -> RemoteResult<Vec<RemotePart>> {
        Ok(client.record("list")?.parts.clone())
    }
}

#[derive(Debug, Default)]
pub struct WidgetKind {
    mapper: WidgetMapper,
    parts: PartHandler,
}

impl EntityKind for WidgetKind {
    type Mapper = WidgetMapper;
    type Client = FakeClient;

    fn name(&self) -> &'static str {
        "widget"
    }

    fn mapper(&self) -> &WidgetMapper {
        &self.mapper
    }

    fn nested(&self) -> Option<&dyn NestedCollection<Widget, FakeClient>> {
        Some(&self.parts)
    }

    fn create(&self, client: &FakeClient, mut request: RemoteWidget) -> RemoteResult<RemoteWidget> {
        let mut state = client.record("create")?;
        request.id = Some("w1".to_string());
        request.note = "created".to_string();
        state.widget = Some(request.clone());
        Ok(request)
    }

    fn read(&self, client: &FakeClient, _persisted: &Widget) -> RemoteResult<RemoteWidget> {
        client.record("read")?.widget.clone().ok_or(RemoteError::Status {
            status: 404,
            message: "widget not found".into(),
        })
    }

    fn update(
        &self,
        client: &FakeClient,
        _persisted: &Widget,
        mut request: RemoteWidget,
    ) -> RemoteResult<RemoteWidget> {
        let mut state = client.record("update")?;
        request.note = "updated".to_string();
        state.widget = Some(request.clone());
        Ok(request)
    }

    fn delete(&self, client: &FakeClient, _persisted: &Widget) -> RemoteResult<()> {
        client.record("delete")?.widget = None;
        Ok(())
    }
}
