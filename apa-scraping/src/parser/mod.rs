pub mod legacy_blob;
pub mod page_info;
pub mod roster;
pub mod team_row;
pub mod validator;
