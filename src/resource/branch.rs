//! Development branches

use crate::remote::{Api, Branch};
use declarative::{
    Diagnostics, EntityKind, EntityMapper, Field, RemoteResult, TranslationError,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DevBranch {
    pub id: Field<i64>,
    pub name: Field<String>,
    pub description: Field<String>,
    pub is_default: Field<bool>,
}

fn branch_id(branch: &DevBranch) -> Result<i64, TranslationError> {
    branch
        .id
        .as_known()
        .copied()
        .ok_or(TranslationError::MissingIdentifier("id"))
}

#[derive(Debug, Default)]
pub struct BranchMapper;

impl EntityMapper for BranchMapper {
    type Local = DevBranch;
    type Remote = Branch;

    fn hydrate(&self, remote: &Branch, local: &mut DevBranch) -> Diagnostics {
        local.id = remote.id.into();
        local.name = Field::Known(remote.name.clone());
        local.description = Field::Known(remote.description.clone());
        local.is_default = Field::Known(remote.is_default);
        Diagnostics::new()
    }

    fn materialize(
        &self,
        persisted: &DevBranch,
        desired: &DevBranch,
    ) -> Result<Branch, TranslationError> {
        Ok(Branch {
            id: desired.id.clone().or(persisted.id.clone()).into_known(),
            name: desired.name.value(),
            description: desired.description.value(),
            is_default: false,
        })
    }

    fn validate(&self, _persisted: Option<&DevBranch>, desired: &mut DevBranch) -> Diagnostics {
        let mut diagnostics = Diagnostics::new();
        if desired.name.is_blank() {
            diagnostics.add_error("Error validating branch", "Name is required");
        }
        desired.description.default_with(String::new);
        diagnostics
    }
}

#[derive(Debug, Default)]
pub struct BranchKind {
    mapper: BranchMapper,
}

impl EntityKind for BranchKind {
    type Mapper = BranchMapper;
    type Client = Api;

    fn name(&self) -> &'static str {
        "branch"
    }

    fn mapper(&self) -> &BranchMapper {
        &self.mapper
    }

    fn create(&self, client: &Api, request: Branch) -> RemoteResult<Branch> {
        client.create_branch(&request)
    }

    fn read(&self, client: &Api, persisted: &DevBranch) -> RemoteResult<Branch> {
        client.get_branch(branch_id(persisted)?)
    }

    fn update(&self, client: &Api, persisted: &DevBranch, request: Branch) -> RemoteResult<Branch> {
        client.update_branch(branch_id(persisted)?, &request)
    }

    fn delete(&self, client: &Api, persisted: &DevBranch) -> RemoteResult<()> {
        client.delete_branch(branch_id(persisted)?)
    }
}
