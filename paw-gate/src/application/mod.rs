pub(crate) mod auth_service;
