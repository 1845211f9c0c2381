// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! SSH credentials and authentication method selection

use crate::error::SshError;
use std::fmt;

/// How the client proves its identity to the remote host
#[derive(Clone, PartialEq, Eq)]
pub enum AuthMethod {
    PrivateKey(String),
    Password(String),
}

impl AuthMethod {
    pub fn kind(&self) -> &'static str {
        match self {
            AuthMethod::PrivateKey(_) => "key",
            AuthMethod::Password(_) => "password",
        }
    }
}

impl fmt::Debug for AuthMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AuthMethod::{}(<redacted>)", self.kind())
    }
}

/// Username plus a password and/or a PEM private key
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
    pub private_key: String,
}

impl Credentials {
    pub fn with_password(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            private_key: String::new(),
        }
    }

    pub fn with_private_key(username: impl Into<String>, private_key: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: String::new(),
            private_key: private_key.into(),
        }
    }

    /// Check the credentials can be used at all, before any I/O
    pub fn validate(&self) -> Result<(), SshError> {
        if self.username.is_empty() {
            return Err(SshError::InvalidUsername);
        }
        if self.password.is_empty() && self.private_key.is_empty() {
            return Err(SshError::InvalidAuth);
        }
        Ok(())
    }

    /// The single method to authenticate with. A private key wins over a password.
    pub fn auth_method(&self) -> Result<AuthMethod, SshError> {
        self.validate()?;
        if !self.private_key.is_empty() {
            Ok(AuthMethod::PrivateKey(self.private_key.clone()))
        } else {
            Ok(AuthMethod::Password(self.password.clone()))
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &(!self.password.is_empty()))
            .field("private_key", &(!self.private_key.is_empty()))
            .finish()
    }
}
