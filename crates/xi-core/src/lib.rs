// Library root for the fantasy XI core: reference data, selection and squad
// state, configuration, and the message types shared with front ends.

pub mod catalog;
pub mod config;
pub mod draft;
pub mod protocol;
