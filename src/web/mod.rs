/// Browser-facing HTTP surface: one chat page and a JSON endpoint.
pub mod routes;
pub mod server;
