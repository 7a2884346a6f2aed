pub(crate) mod paw_backend;
