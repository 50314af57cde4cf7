//! Pseudo-unique device identity sent with login and registration calls

use rand::Rng;

const SUFFIX_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
const SUFFIX_LEN: usize = 9;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceIdentity {
    /// `<platform>_<unix millis>_<9 base36 chars>`
    pub device_id: String,
    pub platform: String,
    pub version: String,
    pub model: String,
    /// Free-text description sent as `sDeviceInfo`
    pub info: String,
}

impl DeviceIdentity {
    pub fn generate(version: &str) -> Self {
        let platform = std::env::consts::OS.to_string();
        let now_ms = chrono::Utc::now().timestamp_millis();
        let device_id = device_id(&platform, now_ms, &mut rand::thread_rng());

        let model = hostname::get()
            .ok()
            .map(|h| h.to_string_lossy().into_owned())
            .filter(|h| !h.trim().is_empty())
            .unwrap_or_else(|| format!("{} Device", platform));

        tracing::debug!("Generated device id {}", device_id);

        Self {
            device_id,
            info: format!("{} Device", platform),
            version: version.to_string(),
            platform,
            model,
        }
    }
}

pub fn device_id<R: Rng + ?Sized>(platform: &str, timestamp_ms: i64, rng: &mut R) -> String {
    let suffix: String = (0..SUFFIX_LEN)
        .map(|_| SUFFIX_ALPHABET[rng.gen_range(0..SUFFIX_ALPHABET.len())] as char)
        .collect();
    format!("{}_{}_{}", platform, timestamp_ms, suffix)
}

/// Holds the one identity a multi-step flow must reuse for every call.
#[derive(Debug, Clone)]
pub struct DeviceIdentityCache {
    version: String,
    cached: Option<DeviceIdentity>,
}

impl DeviceIdentityCache {
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            cached: None,
        }
    }

    /// Get the cached identity or generate it on first use
    pub fn get_or_generate(&mut self) -> &DeviceIdentity {
        let version = &self.version;
        self.cached.get_or_insert_with(|| DeviceIdentity::generate(version))
    }

    pub fn current(&self) -> Option<&DeviceIdentity> {
        self.cached.as_ref()
    }
}
