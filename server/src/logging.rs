//
// Copyright 2017-2026 Hans W. Uhlig. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//

//! Tracing subscriber setup

use crate::{MudError, Result};
use tracing_subscriber::EnvFilter;

/// Environment variable overriding the configured log filter
pub const LOGGING_ENV: &str = "HAVOKMUD_LOGGING";

/// Filter used when nothing else is configured
pub const DEFAULT_FILTER: &str = "info";

/// Choose the filter directive: CLI flag, then environment, then config file.
pub fn filter_directive(cli: Option<&str>, env: Option<&str>, config: Option<&str>) -> String {
    [cli, env, config]
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|directive| !directive.is_empty())
        .unwrap_or(DEFAULT_FILTER)
        .to_string()
}

/// Install the global fmt subscriber.
pub fn init(cli: Option<&str>, config: Option<&str>) -> Result<()> {
    let env = std::env::var(LOGGING_ENV).ok();
    let directive = filter_directive(cli, env.as_deref(), config);
    let filter = EnvFilter::try_new(&directive)
        .map_err(|err| MudError::Logging(format!("invalid filter {:?}: {}", directive, err)))?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init()
        .map_err(|err| MudError::Logging(err.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_precedence() {
        assert_eq!(filter_directive(Some("trace"), Some("debug"), Some("warn")), "trace");
        assert_eq!(filter_directive(None, Some("debug"), Some("warn")), "debug");
        assert_eq!(filter_directive(None, None, Some("warn")), "warn");
        assert_eq!(filter_directive(None, None, None), DEFAULT_FILTER);
    }

    #[test]
    fn test_blank_values_are_skipped() {
        assert_eq!(filter_directive(Some(" "), Some(""), Some("havok_server=debug")), "havok_server=debug");
    }
}
