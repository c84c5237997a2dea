//! `AppConfig`: typed view over the environment variables this worker reads.

use crate::env::{EnvConfigLoader, EnvError};

#[derive(Debug, Clone)]
pub struct PaapiLocaleKeys {
    pub access_key: String,
    pub secret_key: String,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub jobserver_addr: String,
    pub rabbitmq_uri: String,
    pub extraction_queue: String,
    pub extraction_ai_queue: String,
    pub extraction_timeout_secs: u64,
    pub translate_queue: String,
    pub my_pod_ip: Option<String>,
    pub paapi_default: PaapiLocaleKeys,
    pub paapi_locale_overrides: Vec<(String, PaapiLocaleKeys)>,
    pub m101_api_key: Option<String>,
    pub redis_host_addr: String,
    pub rest_rdstoreupdate_addr: String,
    pub proxy_router_addr: String,
    pub cache_service_addr: String,
    pub sitesdb_service_addr: String,
    pub wrapper_service_uri: String,
    pub influxdb_addr: Option<String>,
    pub global_datadog_host: Option<String>,
    pub mongo_uri: Option<String>,
    pub pg_skus_addr: Option<String>,
    pub pg_skus_pass: Option<String>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, EnvError> {
        let loader = EnvConfigLoader::new().default("EXTRACTION_TIMEOUT", "60");

        let paapi_default = PaapiLocaleKeys {
            access_key: loader.get("PAAPI_ACCESS_KEY").unwrap_or_default(),
            secret_key: loader.get("PAAPI_SECRET_KEY").unwrap_or_default(),
        };

        let mut paapi_locale_overrides = Vec::new();
        for (prefix, locale) in [("NL_", "nl"), ("JP_", "jp")] {
            if let (Some(access), Some(secret)) = (
                loader.get_optional(&format!("{prefix}PAAPI_ACCESS_KEY")),
                loader.get_optional(&format!("{prefix}PAAPI_SECRET_KEY")),
            ) {
                paapi_locale_overrides.push((
                    locale.to_string(),
                    PaapiLocaleKeys { access_key: access, secret_key: secret },
                ));
            }
        }

        Ok(AppConfig {
            jobserver_addr: loader.get("JOBSERVER_ADDR")?,
            rabbitmq_uri: loader.get("RABBITMQ_URI")?,
            extraction_queue: loader.get("EXTRACTION_QUEUE")?,
            extraction_ai_queue: loader.get("EXTRACTION_AI_QUEUE")?,
            extraction_timeout_secs: loader.get_u64("EXTRACTION_TIMEOUT")?,
            translate_queue: loader.get("TRANSLATE_QUEUE")?,
            my_pod_ip: loader.get_optional("MY_POD_IP"),
            paapi_default,
            paapi_locale_overrides,
            m101_api_key: loader.get_optional("M101_API_KEY"),
            redis_host_addr: loader.get("REDIS_HOST_ADDR")?,
            rest_rdstoreupdate_addr: loader.get("REST_RDSTOREUPDATE_ADDR")?,
            proxy_router_addr: loader.get("PROXY_ROUTER_ADDR")?,
            cache_service_addr: loader.get("CACHE_SERVICE_ADDR")?,
            sitesdb_service_addr: loader.get("SITESDB_SERVICE_ADDR")?,
            wrapper_service_uri: loader.get("WRAPPER_SERVICE_URI")?,
            influxdb_addr: loader.get_optional("INFLUXDB_ADDR"),
            global_datadog_host: loader.get_optional("GLOBAL_DATADOG_HOST"),
            mongo_uri: loader.get_optional("MONGO_URI"),
            pg_skus_addr: loader.get_optional("PG_SKUS_ADDR"),
            pg_skus_pass: loader.get_optional("PG_SKUS_PASS"),
        })
    }
}
