use anyhow::Result;
use dotenvy::dotenv;
use serde::Deserialize;
use std::env;

#[derive(Debug, Deserialize, Clone)]
pub struct TelephonyConfig {
    pub base_url: String,
    pub account_sid: String,
    pub auth_token: String,
    pub from_number: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub bind_addr: String,
    pub relay_bind_addr: String,
    pub database_url: String,
    pub maps_base_url: String,
    pub maps_api_key: String,
    pub maps_timeout_secs: u64,
    pub relay_url: String,
    pub relay_timeout_secs: u64,
    pub telephony: TelephonyConfig,
    pub log_level: String,
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        dotenv().ok();

        let bind_addr = env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string());
        let relay_bind_addr =
            env::var("RELAY_BIND_ADDR").unwrap_or_else(|_| "127.0.0.1:8081".to_string());

        let db_host = env::var("DB_HOST").unwrap_or_else(|_| "localhost".to_string());
        let db_port = env::var("DB_PORT").unwrap_or_else(|_| "5432".to_string());
        let db_name = env::var("DB_DATABASE").unwrap_or_else(|_| "alertmate".to_string());
        let db_user = env::var("DB_USER").unwrap_or_else(|_| "alertmate".to_string());
        let db_pwd = env::var("DB_PWD").unwrap_or_else(|_| "alertmate".to_string());

        let database_url = format!(
            "postgres://{}:{}@{}:{}/{}",
            db_user, db_pwd, db_host, db_port, db_name
        );

        let maps_base_url = env::var("MAPS_BASE_URL")
            .unwrap_or_else(|_| "https://maps.googleapis.com/maps/api".to_string());
        let maps_api_key = env::var("MAPS_API_KEY").unwrap_or_default();
        let maps_timeout_secs = env::var("MAPS_TIMEOUT_SECS")
            .unwrap_or_else(|_| "10".to_string())
            .parse()
            .unwrap_or(10);

        let relay_url =
            env::var("RELAY_URL").unwrap_or_else(|_| "http://127.0.0.1:8081".to_string());
        let relay_timeout_secs = env::var("RELAY_TIMEOUT_SECS")
            .unwrap_or_else(|_| "15".to_string())
            .parse()
            .unwrap_or(15);

        let telephony = TelephonyConfig {
            base_url: env::var("TELEPHONY_BASE_URL")
                .unwrap_or_else(|_| "https://api.twilio.com/2010-04-01".to_string()),
            account_sid: env::var("TELEPHONY_ACCOUNT_SID").unwrap_or_default(),
            auth_token: env::var("TELEPHONY_AUTH_TOKEN").unwrap_or_default(),
            from_number: env::var("TELEPHONY_FROM_NUMBER").unwrap_or_default(),
        };

        let log_level = env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        Ok(AppConfig {
            bind_addr,
            relay_bind_addr,
            database_url,
            maps_base_url,
            maps_api_key,
            maps_timeout_secs,
            relay_url,
            relay_timeout_secs,
            telephony,
            log_level,
        })
    }
}
