use serde::{Deserialize, Serialize};
use strum::AsRefStr;

/// 默认配置文件路径
pub const DEFAULT_CONFIG_PATH: &str = "config.toml";

/// 数据源后端类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default, AsRefStr)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum DatastoreBackend {
    /// Hosted REST endpoint (`<url>/rest/v1/<table>`), authenticated by a service key
    #[default]
    Postgrest,
    /// Direct SQL connection (sqlite:// or postgres://) through SeaORM
    Sql,
}

impl std::fmt::Display for DatastoreBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_ref())
    }
}

impl std::str::FromStr for DatastoreBackend {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "postgrest" | "supabase" | "rest" => Ok(Self::Postgrest),
            "sql" | "sqlite" | "postgres" => Ok(Self::Sql),
            _ => Err(format!(
                "Invalid datastore backend: '{}'. Valid: postgrest, sql",
                s
            )),
        }
    }
}

/// 静态配置（从 TOML 加载，启动时使用）
///
/// 包含：
/// - server: 服务器地址、端口、CPU 数量
/// - datastore: 数据源地址与访问密钥
/// - routes: 路由前缀
/// - dashboard: 看板计算参数（时区偏移、表格行数等）
/// - cors: 跨域配置
/// - logging: 日志配置
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StaticConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub datastore: DatastoreConfig,
    #[serde(default)]
    pub routes: RoutesConfig,
    #[serde(default)]
    pub dashboard: DashboardConfig,
    #[serde(default)]
    pub cors: CorsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl StaticConfig {
    /// 从 TOML 文件和环境变量加载配置
    ///
    /// 优先级：ENV > config.toml > 默认值
    /// ENV 前缀：FB，分隔符：__
    /// 示例：FB__SERVER__PORT=9999
    pub fn load(path: Option<&str>) -> Self {
        use config::{Config, Environment, File};

        let path = path.unwrap_or(DEFAULT_CONFIG_PATH);

        let builder = Config::builder()
            // 1. 从 TOML 文件加载（可选）
            .add_source(File::with_name(path).required(false))
            // 2. 从环境变量覆盖，前缀 FB，分隔符 __
            .add_source(
                Environment::with_prefix("FB")
                    .separator("__")
                    .try_parsing(true),
            );

        let mut config = match builder.build() {
            Ok(settings) => match settings.try_deserialize::<StaticConfig>() {
                Ok(config) => {
                    if std::path::Path::new(path).exists() {
                        eprintln!("[INFO] Configuration loaded from: {}", path);
                    }
                    config
                }
                Err(e) => {
                    eprintln!("[ERROR] Failed to deserialize config: {}", e);
                    Self::default()
                }
            },
            Err(e) => {
                eprintln!("[ERROR] Failed to build config: {}", e);
                Self::default()
            }
        };

        config.datastore.apply_env_fallbacks(|key| std::env::var(key).ok());
        config
    }

    /// 生成示例 TOML 配置文件
    pub fn generate_sample_config() -> String {
        let sample_config = Self::default();
        toml::to_string_pretty(&sample_config)
            .unwrap_or_else(|e| format!("Error generating sample config: {}", e))
    }

    /// 保存配置到 TOML 文件
    pub fn save_to_file<P: AsRef<std::path::Path>>(
        &self,
        path: P,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let content = toml::to_string_pretty(self)?;

        if let Some(parent) = path.as_ref().parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(path, content)?;
        Ok(())
    }
}

/// 服务器配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_server_host")]
    pub host: String,
    #[serde(default = "default_server_port")]
    pub port: u16,
    #[serde(default = "default_cpu_count")]
    pub cpu_count: usize,
}

/// 数据源配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatastoreConfig {
    #[serde(default)]
    pub backend: DatastoreBackend,
    /// postgrest: 项目地址（https://xyz.supabase.co）；sql: 数据库 URL
    #[serde(default)]
    pub url: String,
    /// postgrest 的 service role key（sql 后端忽略）
    #[serde(default)]
    pub service_key: String,
    #[serde(default = "default_datastore_timeout")]
    pub timeout_secs: u64,
    /// 单次 REST 请求返回的最大行数，超过时分页读取
    #[serde(default = "default_page_size")]
    pub page_size: usize,
    #[serde(default = "default_pool_size")]
    pub pool_size: u32,
}

/// 约定俗成的环境变量名，作为 `datastore.url` 的后备
pub const URL_ENV_FALLBACKS: [&str; 2] = ["SUPABASE_URL", "NEXT_PUBLIC_SUPABASE_URL"];
/// 作为 `datastore.service_key` 的后备
pub const KEY_ENV_FALLBACKS: [&str; 1] = ["SUPABASE_SERVICE_ROLE_KEY"];

impl DatastoreConfig {
    /// 未显式配置时，从常见环境变量补全 url / service_key
    pub fn apply_env_fallbacks<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let first_set = |keys: &[&str]| {
            keys.iter()
                .filter_map(|k| lookup(*k))
                .find(|v| !v.trim().is_empty())
        };

        if self.url.trim().is_empty()
            && let Some(url) = first_set(&URL_ENV_FALLBACKS)
        {
            self.url = url;
        }
        if self.service_key.trim().is_empty()
            && let Some(key) = first_set(&KEY_ENV_FALLBACKS)
        {
            self.service_key = key;
        }
    }

    /// 启动时检查：缺失项返回描述，不阻止进程启动
    pub fn missing_settings(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.url.trim().is_empty() {
            missing.push("datastore.url");
        }
        if self.backend == DatastoreBackend::Postgrest && self.service_key.trim().is_empty() {
            missing.push("datastore.service_key");
        }
        missing
    }
}

/// 路由配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutesConfig {
    #[serde(default = "default_api_prefix")]
    pub api_prefix: String,
    #[serde(default = "default_health_prefix")]
    pub health_prefix: String,
    #[serde(default = "default_enable_frontend")]
    pub enable_frontend: bool,
}

/// 看板计算参数
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardConfig {
    /// 按天分组与日期过滤使用的本地时区偏移（分钟，东正西负）
    #[serde(default)]
    pub utc_offset_minutes: i32,
    /// 每张表最多返回的行数
    #[serde(default = "default_row_limit")]
    pub row_limit: usize,
    /// 最活跃 code 的数量
    #[serde(default = "default_top_codes")]
    pub top_codes: usize,
    /// "最近打开" 的时间窗口（小时）
    #[serde(default = "default_recent_window_hours")]
    pub recent_window_hours: i64,
}

/// CORS 配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorsConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub allowed_origins: Vec<String>,
    #[serde(default = "default_cors_max_age")]
    pub max_age: u64,
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
    #[serde(default = "default_log_file")]
    pub file: Option<String>,
    #[serde(default = "default_max_backups")]
    pub max_backups: u32,
    #[serde(default = "default_enable_rotation")]
    pub enable_rotation: bool,
}

// ============================================================
// Default value functions for static config
// ============================================================

fn default_server_host() -> String {
    "127.0.0.1".to_string()
}

fn default_server_port() -> u16 {
    8080
}

fn default_cpu_count() -> usize {
    num_cpus::get()
}

fn default_datastore_timeout() -> u64 {
    10
}

fn default_page_size() -> usize {
    1000
}

fn default_pool_size() -> u32 {
    5
}

fn default_api_prefix() -> String {
    "/api".to_string()
}

fn default_health_prefix() -> String {
    "/health".to_string()
}

fn default_enable_frontend() -> bool {
    true
}

fn default_row_limit() -> usize {
    50
}

fn default_top_codes() -> usize {
    5
}

fn default_recent_window_hours() -> i64 {
    24
}

fn default_cors_max_age() -> u64 {
    3600
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

fn default_log_file() -> Option<String> {
    None
}

fn default_max_backups() -> u32 {
    5
}

fn default_enable_rotation() -> bool {
    true
}

// ============================================================
// Default implementations
// ============================================================

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_server_host(),
            port: default_server_port(),
            cpu_count: default_cpu_count(),
        }
    }
}

impl Default for DatastoreConfig {
    fn default() -> Self {
        Self {
            backend: DatastoreBackend::default(),
            url: String::new(),
            service_key: String::new(),
            timeout_secs: default_datastore_timeout(),
            page_size: default_page_size(),
            pool_size: default_pool_size(),
        }
    }
}

impl Default for RoutesConfig {
    fn default() -> Self {
        Self {
            api_prefix: default_api_prefix(),
            health_prefix: default_health_prefix(),
            enable_frontend: default_enable_frontend(),
        }
    }
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            utc_offset_minutes: 0,
            row_limit: default_row_limit(),
            top_codes: default_top_codes(),
            recent_window_hours: default_recent_window_hours(),
        }
    }
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            allowed_origins: Vec::new(),
            max_age: default_cors_max_age(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            file: default_log_file(),
            max_backups: default_max_backups(),
            enable_rotation: default_enable_rotation(),
        }
    }
}
