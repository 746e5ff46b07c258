pub mod eod_setting;
pub mod reference;
