pub mod option_refresh_job;
pub mod staking_option;
pub mod staking_transaction;
pub mod staking_user;
pub mod transaction_job;
