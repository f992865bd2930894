//! Query capabilities and dispatch for the medical guide.
//!
//! This crate provides:
//! - The capability catalog the completion service calls (doctor, hospital,
//!   location and staff searches plus the `smart_search` catch-all)
//! - The `QueryRouter` dispatcher that rewrites, contextualizes and retries
//!   those calls for the turn controller
//! - The `DirectoryStore` seam over the doctor/hospital directory and an
//!   in-memory implementation of it
//! - Korean medical term dictionaries (disease standardization, disease to
//!   department mapping, hospital name aliases)
//!
//! Core abstractions (Tool trait, ToolRegistry, DispatchContext, etc.) are
//! defined in `aiga-agent` and consumed here.

pub mod args;
pub mod catalog;
pub mod dictionary;
pub mod memory;
pub mod records;
pub mod router;
pub mod store;

// Re-export the catalog surface at crate root
pub use catalog::{
    DoctorByNameTool, DoctorsByDepartmentOnlyTool, DoctorsByDiseaseAndDepartmentTool,
    DoctorsByDiseaseOnlyTool, DoctorsByHospitalTool, DoctorsByLocationTool,
    HospitalsByDepartmentTool, HospitalsByDiseaseAndDepartmentTool, HospitalsByDiseaseOnlyTool,
    HospitalsByDiseaseTool, HospitalsByDepartmentOnlyTool, HospitalsByLocationTool,
    LocationOnlyTool, RecommendDoctorsTool, SmartSearchTool, default_catalog,
};

// Directory seam and backing data
pub use memory::{DirectoryData, InMemoryDirectory};
pub use store::{DirectoryStore, DoctorQuery, HospitalQuery, SearchArea, TokenMatch};

// Record shapes shared by the catalog payloads
pub use records::{AiScore, DoctorRecord, DoctorScore, HospitalRecord, dedup_doctors};

// Argument plumbing
pub use args::{StringOrList, final_limit};

pub use router::QueryRouter;
