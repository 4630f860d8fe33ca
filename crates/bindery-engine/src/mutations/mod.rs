//! Mutation variants, one per task kind.

pub(crate) mod clone;
pub(crate) mod edit;
pub(crate) mod eval;
pub(crate) mod init;
pub(crate) mod patch;
pub(crate) mod render;
pub(crate) mod replace;
pub(crate) mod update;

pub(crate) use clone::ClonePackageMutation;
pub(crate) use edit::EditPackageMutation;
pub(crate) use eval::EvalFunctionMutation;
pub(crate) use init::InitPackageMutation;
pub(crate) use patch::build_patch_mutation;
pub(crate) use render::RenderPackageMutation;
pub(crate) use replace::ReplaceResourcesMutation;
pub(crate) use update::UpdatePackageMutation;
