/// Page flows that coordinate API calls with the subject's session.
///
/// Each flow is a plain state holder driven by the page handlers; none of them
/// touch HTTP request/response types, so they are exercised directly in tests.

/// Migrant browses agencies and files a verification request.
pub mod select_agency;

/// Government officers review agencies and verify or reject them.
pub mod gov_dashboard;
