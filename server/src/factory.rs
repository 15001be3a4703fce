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

use crate::{AppContext, LoginHandler};
use async_trait::async_trait;
use havok_service::{BoxError, Session, SessionFactory, SessionHandler};
use std::sync::Arc;
use tracing::debug;

/// Starts every accepted session at the login prompt.
#[derive(Debug, Clone)]
pub struct MudFactory {
    ctx: Arc<AppContext>,
}

impl MudFactory {
    /// Factory sharing `ctx` with every session
    pub fn new(ctx: Arc<AppContext>) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl SessionFactory for MudFactory {
    async fn create(&self, session: Arc<Session>) -> Result<Box<dyn SessionHandler>, BoxError> {
        let hostname = self.ctx.dns().reverse_lookup(session.peer_addr().ip()).await;
        debug!(session_id = %session.id(), hostname = %hostname, "Resolved peer");
        session.set_hostname(hostname);
        Ok(Box::new(LoginHandler::new(self.ctx.clone(), session)))
    }
}
