/// Supplies the `User-Agent` sent with each request.
pub trait IdentityProvider: Send + Sync {
    fn user_agent(&self) -> String;
}

/// Desktop browser identities to rotate through.
pub const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:125.0) Gecko/20100101 Firefox/125.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 14_4_1) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.4.1 Safari/605.1.15",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 14.4; rv:125.0) Gecko/20100101 Firefox/125.0",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
    "Mozilla/5.0 (X11; Ubuntu; Linux x86_64; rv:125.0) Gecko/20100101 Firefox/125.0",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36 Edg/124.0.2478.80",
];

/// Picks a random identity from a pool on every call.
#[derive(Debug, Clone)]
pub struct RandomIdentity {
    pool: Vec<String>,
}

impl Default for RandomIdentity {
    fn default() -> Self {
        Self {
            pool: USER_AGENTS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl IdentityProvider for RandomIdentity {
    fn user_agent(&self) -> String {
        fastrand::choice(&self.pool)
            .cloned()
            .unwrap_or_else(|| USER_AGENTS[0].to_string())
    }
}

/// Always sends the same identity.
#[derive(Debug, Clone)]
pub struct FixedIdentity(pub String);

impl IdentityProvider for FixedIdentity {
    fn user_agent(&self) -> String {
        self.0.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_random_identity_stays_in_pool() {
        let identity = RandomIdentity::default();
        for _ in 0..50 {
            assert!(USER_AGENTS.contains(&identity.user_agent().as_str()));
        }
    }

    #[test]
    fn test_fixed_identity() {
        let identity = FixedIdentity("metallum-test/1.0".into());
        assert_eq!(identity.user_agent(), "metallum-test/1.0");
        assert_eq!(identity.user_agent(), "metallum-test/1.0");
    }
}
