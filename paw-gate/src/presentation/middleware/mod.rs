pub(crate) mod cors;
pub(crate) mod session_gate;
pub(crate) mod trace;
