//! Plan management: path normalization, schema validation, acquisition from
//! a generation backend, and the persisted plan artifact.

pub mod acquire;
pub mod artifact;
pub mod model;
pub mod path;
pub mod validate;

pub use acquire::{
    AcquireError, acquire_plan, acquire_plan_detailed, build_plan_prompt, build_repair_prompt,
    parse_plan_text,
};
pub use artifact::{PLAN_ARTIFACT_PATH, artifact_path, load_plan, save_plan, write_plan};
pub use model::{FileSpec, Plan, PlanMetadata, StepAction, StepSpec};
pub use path::{PathRejected, normalize_path};
pub use validate::{PLAN_VERSION, PlanValidationError, validate_plan};
