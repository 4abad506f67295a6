use crate::dto::{
    LoginRequest, LoginResponse, ResponseData, UserDetails, RESPONSE_BAD_REQUEST,
    RESPONSE_CREATED, RESPONSE_NOT_FOUND, RESPONSE_OK,
};
use crate::pool::Db;
use chrono::Utc;
use rocket::serde::json::Json;
use sea_orm::{
    entity::Set as EntitySet, ActiveModelTrait, ActiveValue, EntityTrait, IntoActiveModel,
};
use sea_orm::prelude::Decimal;
use sea_orm_rocket::Connection;
use staking_db_entity::db::staking_user::{
    ActiveModel as StakingUserActiveModel, Entity as StakingUser,
};
use tracing::{info, warn};

/// Wallet-address login: refreshes `last_login` for a known address,
/// creates the profile otherwise.
#[post("/api/users/login", data = "<request>")]
pub async fn login_user(
    conn: Connection<'_, Db>,
    request: Json<LoginRequest>,
) -> Json<ResponseData<LoginResponse>> {
    let request = request.into_inner();
    if request.wallet_address.is_empty() {
        return Json(ResponseData::new(
            RESPONSE_BAD_REQUEST,
            "Wallet address is required".to_owned(),
            None,
        ));
    }

    let db = conn.into_inner();
    let wallet_address = request.wallet_address.to_lowercase();
    let now = Utc::now().timestamp();

    match StakingUser::find_by_id(wallet_address.to_owned()).one(db).await {
        Ok(Some(user)) => {
            let mut active = user.into_active_model();
            active.last_login = EntitySet(now);
            match active.update(db).await {
                Ok(updated) => {
                    info!("User logged in: {wallet_address}");
                    Json(ResponseData::new(
                        RESPONSE_OK,
                        "".to_owned(),
                        Some(LoginResponse {
                            user: UserDetails::new(&updated),
                            is_new_user: false,
                        }),
                    ))
                }
                Err(error) => {
                    warn!("Error updating user login: {:?}", error);
                    Json(ResponseData::new(
                        RESPONSE_BAD_REQUEST,
                        "Failed to process user login".to_owned(),
                        None,
                    ))
                }
            }
        }
        Ok(None) => {
            let user = StakingUserActiveModel {
                wallet_address: ActiveValue::Set(wallet_address.to_owned()),
                created_at: ActiveValue::Set(now),
                last_login: ActiveValue::Set(now),
                total_staked: ActiveValue::Set(Decimal::ZERO),
                total_earnings: ActiveValue::Set(Decimal::ZERO),
            };
            match StakingUser::insert(user).exec(db).await {
                Ok(_) => match StakingUser::find_by_id(wallet_address.to_owned()).one(db).await {
                    Ok(Some(created)) => {
                        info!("New user created: {wallet_address}");
                        Json(ResponseData::new(
                            RESPONSE_CREATED,
                            "".to_owned(),
                            Some(LoginResponse {
                                user: UserDetails::new(&created),
                                is_new_user: true,
                            }),
                        ))
                    }
                    _ => Json(ResponseData::new(RESPONSE_CREATED, "".to_owned(), None)),
                },
                Err(error) => {
                    warn!("Error creating user: {:?}", error);
                    Json(ResponseData::new(
                        RESPONSE_BAD_REQUEST,
                        "Failed to process user login".to_owned(),
                        None,
                    ))
                }
            }
        }
        Err(error) => {
            warn!("Error in user login: {:?}", error);
            Json(ResponseData::new(
                RESPONSE_BAD_REQUEST,
                "Failed to process user login".to_owned(),
                None,
            ))
        }
    }
}

#[get("/api/users/<wallet_address>")]
pub async fn get_user_by_address(
    conn: Connection<'_, Db>,
    wallet_address: String,
) -> Json<ResponseData<UserDetails>> {
    let db = conn.into_inner();
    match StakingUser::find_by_id(wallet_address.to_lowercase()).one(db).await {
        Ok(Some(user)) => Json(ResponseData::new(
            RESPONSE_OK,
            "".to_owned(),
            Some(UserDetails::new(&user)),
        )),
        Ok(None) => Json(ResponseData::new(
            RESPONSE_NOT_FOUND,
            "User not found".to_owned(),
            None,
        )),
        Err(error) => {
            warn!("Error fetching user {wallet_address}: {:?}", error);
            Json(ResponseData::new(
                RESPONSE_BAD_REQUEST,
                "Failed to fetch user".to_owned(),
                None,
            ))
        }
    }
}
