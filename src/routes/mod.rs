/// Router Module Index
///
/// Splits the portal's route table by the access it requires. The guarded
/// modules are wrapped in the access-guard middleware by `create_router`, so
/// no guarded page can be mounted outside it by accident.

/// Routes any browser may open: landing, home, sign-in/sign-up, 404.
pub mod public;

/// Migrant pages, gated on sign-in, migrant status and agency verification.
pub mod migrant;

/// Department and government dashboards, gated on staff credentials.
pub mod staff;
