//! Pure address checks and the DNS mail-exchange lookup.

pub(crate) mod disposable;
pub(crate) mod dns;
pub(crate) mod quality;
pub(crate) mod role;
pub(crate) mod syntax;
pub(crate) mod typo;
