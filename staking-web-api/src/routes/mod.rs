use rocket::fairing::AdHoc;

pub mod options;
pub mod staking;
pub mod transactions;
pub mod users;

pub fn mount() -> AdHoc {
    AdHoc::on_ignite("Attaching Routes", |rocket| async {
        rocket.mount(
            "/",
            routes![
                options::get_options,
                options::create_option,
                options::trigger_refresh,
                staking::execute_stake,
                staking::execute_unstake,
                staking::get_stake_quote,
                transactions::create_transaction,
                transactions::get_transactions_by_user,
                transactions::update_transaction_status,
                users::login_user,
                users::get_user_by_address
            ],
        )
    })
}
