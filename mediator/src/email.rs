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

//! Outbound email resource

use crate::{Mediator, MediatorResult, Resource};
use async_trait::async_trait;
use lettre::message::{Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

/// Email error types
#[derive(Debug, Error)]
pub enum EmailError {
    /// Sender or recipient is not a valid mailbox
    #[error("Invalid address: {0}")]
    Address(#[from] lettre::address::AddressError),

    /// Message could not be assembled
    #[error("Invalid message: {0}")]
    Message(#[from] lettre::error::Error),

    /// SMTP transport failure
    #[error("SMTP error: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),

    /// Outbox write failure
    #[error("Outbox error: {0}")]
    Io(#[from] std::io::Error),

    /// Neither an HTML nor a text body was supplied
    #[error("Email has no body")]
    EmptyBody,
}

/// A message to send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Email {
    /// Sender mailbox
    pub from: String,
    /// Recipient mailbox
    pub to: String,
    /// Subject line
    pub subject: String,
    /// HTML body
    pub html: Option<String>,
    /// Plain text body
    pub text: Option<String>,
}

impl Email {
    /// Assemble the MIME message.
    ///
    /// A text-only email gets an HTML alternative generated from the escaped
    /// text.
    pub fn to_message(&self) -> Result<Message, EmailError> {
        let builder = Message::builder()
            .from(self.from.parse::<Mailbox>()?)
            .to(self.to.parse::<Mailbox>()?)
            .subject(self.subject.as_str());
        let message = match (&self.text, &self.html) {
            (Some(text), Some(html)) => {
                builder.multipart(MultiPart::alternative_plain_html(text.clone(), html.clone()))?
            }
            (Some(text), None) => builder.multipart(MultiPart::alternative_plain_html(
                text.clone(),
                format!("<pre>{}</pre>", escape_html(text)),
            ))?,
            (None, Some(html)) => builder.singlepart(SinglePart::html(html.clone()))?,
            (None, None) => return Err(EmailError::EmptyBody),
        };
        Ok(message)
    }
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// How email leaves the process.
#[derive(Clone)]
pub enum EmailTransport {
    /// Messages are logged and dropped
    Disabled,
    /// Messages are written to `<dir>/<uuid>.eml`
    Outbox(PathBuf),
    /// Messages are relayed over SMTP
    Smtp(Arc<AsyncSmtpTransport<Tokio1Executor>>),
}

impl std::fmt::Debug for EmailTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EmailTransport::Disabled => f.write_str("Disabled"),
            EmailTransport::Outbox(dir) => f.debug_tuple("Outbox").field(dir).finish(),
            EmailTransport::Smtp(_) => f.write_str("Smtp"),
        }
    }
}

impl EmailTransport {
    /// SMTP relay, with STARTTLS when `starttls` is set.
    pub fn smtp(
        host: &str,
        port: u16,
        username: Option<&str>,
        password: Option<&str>,
        starttls: bool,
    ) -> Result<EmailTransport, EmailError> {
        let mut builder = if starttls {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(host)
        }
        .port(port);
        if let Some(user) = username.filter(|user| !user.is_empty()) {
            builder = builder.credentials(Credentials::new(
                user.to_string(),
                password.unwrap_or_default().to_string(),
            ));
        }
        Ok(EmailTransport::Smtp(Arc::new(builder.build())))
    }
}

/// Operations understood by an [`EmailTransport`]
#[derive(Debug, Clone)]
pub enum EmailRequest {
    /// Deliver one message
    Send(Email),
}

#[async_trait]
impl Resource for EmailTransport {
    type Request = EmailRequest;
    type Reply = ();
    type Error = EmailError;

    async fn handle(&mut self, request: EmailRequest) -> Result<(), EmailError> {
        let EmailRequest::Send(email) = request;
        let message = email.to_message()?;
        match self {
            EmailTransport::Disabled => {
                debug!(to = %email.to, subject = %email.subject, "Email disabled, dropping message");
            }
            EmailTransport::Outbox(dir) => {
                tokio::fs::create_dir_all(&*dir).await?;
                let path = dir.join(format!("{}.eml", uuid::Uuid::new_v4()));
                tokio::fs::write(&path, message.formatted()).await?;
                info!(to = %email.to, path = %path.display(), "Email written to outbox");
            }
            EmailTransport::Smtp(transport) => {
                transport.send(message).await?;
                info!(to = %email.to, subject = %email.subject, "Email sent");
            }
        }
        Ok(())
    }
}

/// Handle to the email actor.
#[derive(Clone, Debug)]
pub struct EmailHandle {
    mediator: Mediator<(), EmailTransport>,
}

impl EmailHandle {
    /// Spawn an email actor around `transport`.
    pub fn spawn(transport: EmailTransport) -> EmailHandle {
        EmailHandle {
            mediator: Mediator::single("email", transport),
        }
    }

    /// Send a message and wait for the transport's verdict.
    pub async fn send(&self, email: Email) -> MediatorResult<(), EmailError> {
        self.mediator.call(EmailRequest::Send(email)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn email(text: Option<&str>, html: Option<&str>) -> Email {
        Email {
            from: "mud@example.com".to_string(),
            to: "player@example.com".to_string(),
            subject: "Confirm".to_string(),
            html: html.map(str::to_string),
            text: text.map(str::to_string),
        }
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(escape_html("<a & 'b'>"), "&lt;a &amp; &#39;b&#39;&gt;");
    }

    #[test]
    fn test_text_only_gets_html_alternative() {
        let message = email(Some("code: <1234>"), None).to_message().unwrap();
        let raw = String::from_utf8_lossy(&message.formatted()).to_string();
        assert!(raw.contains("multipart/alternative"));
        assert!(raw.contains("&lt;1234&gt;"));
    }

    #[test]
    fn test_empty_and_invalid() {
        assert!(matches!(email(None, None).to_message(), Err(EmailError::EmptyBody)));
        let mut bad = email(Some("x"), None);
        bad.to = "not an address".to_string();
        assert!(matches!(bad.to_message(), Err(EmailError::Address(_))));
    }

    #[tokio::test]
    async fn test_outbox_writes_file() {
        let dir = std::env::temp_dir().join(format!("havok-outbox-{}", uuid::Uuid::new_v4()));
        let handle = EmailHandle::spawn(EmailTransport::Outbox(dir.clone()));
        handle.send(email(Some("hello"), None)).await.unwrap();
        let mut entries = tokio::fs::read_dir(&dir).await.unwrap();
        let entry = entries.next_entry().await.unwrap().unwrap();
        assert!(entry.file_name().to_string_lossy().ends_with(".eml"));
        tokio::fs::remove_dir_all(&dir).await.unwrap();
    }
}
