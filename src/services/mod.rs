//! Clients for the external collaborators: candidate discovery and result history.

pub(crate) mod discovery;
pub(crate) mod history;
