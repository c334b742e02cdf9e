/// Router Module Index
///
/// Splits routing by how requests are authenticated. Both trees are wrapped by the
/// request gate in `create_router`; the gate treats them differently by path.

/// `/api/*` routes. Skipped by the gate's session check; handlers authenticate.
pub mod api;

/// HTML page routes, gated by session state.
pub mod pages;
