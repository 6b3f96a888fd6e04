/*!
Shared error and result types.
*/
pub mod err;
