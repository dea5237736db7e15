/*
 *  Copyright 2025-2026 Helpline Maintainers
 *
 *  Licensed under the Apache License, Version 2.0 (the "License");
 *  you may not use this file except in compliance with the License.
 *  You may obtain a copy of the License at
 *
 *      http://www.apache.org/licenses/LICENSE-2.0
 *
 *  Unless required by applicable law or agreed to in writing, software
 *  distributed under the License is distributed on an "AS IS" BASIS,
 *  WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 *  See the License for the specific language governing permissions and
 *  limitations under the License.
 */

//! Message producer port.
//!
//! Jobs forward chat messages to a downstream broker topic through this
//! port; the broker client itself lives outside the core. The optional
//! [`EncryptingProducer`] decorator encrypts message bodies at rest with
//! AES-256-GCM before they leave the process. The encrypted format is
//! `nonce (12 bytes) || ciphertext || tag (16 bytes)`, base64-encoded.

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use rand::RngCore;
use uuid::Uuid;

use crate::error::ProducerError;

/// Size of the AES-256-GCM nonce in bytes.
const NONCE_SIZE: usize = 12;

/// A chat message bound for the downstream broker.
#[derive(Debug, Clone, PartialEq)]
pub struct OutboundMessage {
    pub id: Uuid,
    pub chat_id: Uuid,
    pub body: String,
}

/// Forwards chat messages to a downstream broker topic.
#[async_trait]
pub trait MessageProducer: Send + Sync {
    async fn produce(&self, message: OutboundMessage) -> Result<(), ProducerError>;
}

/// Decorator that AEAD-encrypts message bodies before delegating.
pub struct EncryptingProducer<P> {
    inner: P,
    cipher: Aes256Gcm,
}

impl<P> std::fmt::Debug for EncryptingProducer<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EncryptingProducer").finish_non_exhaustive()
    }
}

impl<P: MessageProducer> EncryptingProducer<P> {
    /// Wraps `inner` with a 32-byte AES-256 key.
    pub fn new(inner: P, key: &[u8]) -> Result<Self, ProducerError> {
        if key.len() != 32 {
            return Err(ProducerError::InvalidKeyLength(key.len()));
        }
        let cipher = Aes256Gcm::new_from_slice(key)
            .map_err(|e| ProducerError::EncryptionFailed(e.to_string()))?;
        Ok(Self { inner, cipher })
    }

    fn encrypt(&self, plaintext: &str) -> Result<String, ProducerError> {
        let mut nonce_bytes = [0u8; NONCE_SIZE];
        rand::thread_rng().fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = self
            .cipher
            .encrypt(nonce, plaintext.as_bytes())
            .map_err(|e| ProducerError::EncryptionFailed(e.to_string()))?;

        let mut sealed = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
        sealed.extend_from_slice(&nonce_bytes);
        sealed.extend_from_slice(&ciphertext);

        Ok(BASE64.encode(sealed))
    }
}

#[async_trait]
impl<P: MessageProducer> MessageProducer for EncryptingProducer<P> {
    async fn produce(&self, message: OutboundMessage) -> Result<(), ProducerError> {
        let body = self.encrypt(&message.body)?;
        self.inner
            .produce(OutboundMessage { body, ..message })
            .await
    }
}
