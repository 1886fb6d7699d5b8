use anyhow::{anyhow, Context};
use std::env;

use crate::services::LookupStrategy;

pub const DEFAULT_PAGE_SIZE: u64 = 10;
pub const DEFAULT_TIMEOUT_SECS: u64 = 15;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub courses_page_size: u64,
    pub request_timeout_secs: u64,
    pub student_tables: Vec<LookupStrategy>,
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |primary: &str, fallback: &str| {
            lookup(primary)
                .or_else(|| lookup(fallback))
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let supabase_url = var("SUPABASE_URL", "EXPO_PUBLIC_SUPABASE_URL")
            .ok_or_else(|| anyhow!("SUPABASE_URL is not set"))?
            .trim_end_matches('/')
            .to_string();
        if !supabase_url.starts_with("http://") && !supabase_url.starts_with("https://") {
            return Err(anyhow!("Invalid SUPABASE_URL value: {}", supabase_url));
        }

        let supabase_anon_key = var("SUPABASE_ANON_KEY", "EXPO_PUBLIC_SUPABASE_ANON_KEY")
            .ok_or_else(|| anyhow!("SUPABASE_ANON_KEY is not set"))?;

        let courses_page_size = match lookup("COURSES_PAGE_SIZE") {
            Some(raw) => raw
                .trim()
                .parse::<u64>()
                .ok()
                .filter(|size| *size >= 1)
                .ok_or_else(|| anyhow!("Invalid COURSES_PAGE_SIZE value: {}", raw))?,
            None => DEFAULT_PAGE_SIZE,
        };

        let request_timeout_secs = lookup("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|| DEFAULT_TIMEOUT_SECS.to_string())
            .trim()
            .parse()
            .unwrap_or(DEFAULT_TIMEOUT_SECS);

        let student_tables = match lookup("STUDENT_TABLES") {
            Some(raw) => parse_student_tables(&raw).context("Invalid STUDENT_TABLES value")?,
            None => LookupStrategy::defaults(),
        };

        Ok(Config {
            supabase_url,
            supabase_anon_key,
            courses_page_size,
            request_timeout_secs,
            student_tables,
        })
    }
}

/// `table:email_column` pairs separated by commas, tried in order.
pub fn parse_student_tables(raw: &str) -> anyhow::Result<Vec<LookupStrategy>> {
    let mut strategies = Vec::new();
    for entry in raw.split(',').map(str::trim).filter(|e| !e.is_empty()) {
        let (table, column) = entry
            .split_once(':')
            .map(|(t, c)| (t.trim(), c.trim()))
            .filter(|(t, c)| !t.is_empty() && !c.is_empty())
            .ok_or_else(|| anyhow!("expected table:email_column, found {}", entry))?;
        strategies.push(LookupStrategy::new(table, column));
    }
    if strategies.is_empty() {
        return Err(anyhow!("no lookup strategies given"));
    }
    Ok(strategies)
}
