//! RSA fixtures shared by unit tests.

use rsa::{
    pkcs1::DecodeRsaPrivateKey, pkcs8::DecodePrivateKey, RsaPrivateKey, RsaPublicKey,
};

pub(crate) const RECIPIENT_CERT_PEM: &str = include_str!("../testdata/recipient.crt");
pub(crate) const RECIPIENT_KEY_PEM: &str = include_str!("../testdata/recipient.key");
pub(crate) const RECIPIENT_PKCS1_KEY_PEM: &str = include_str!("../testdata/recipient-pkcs1.key");
pub(crate) const INTRUDER_CERT_PEM: &str = include_str!("../testdata/intruder.crt");
pub(crate) const INTRUDER_KEY_PEM: &str = include_str!("../testdata/intruder.key");

pub(crate) fn recipient_private() -> RsaPrivateKey {
    RsaPrivateKey::from_pkcs8_pem(RECIPIENT_KEY_PEM).unwrap()
}

pub(crate) fn recipient_public() -> RsaPublicKey {
    recipient_private().to_public_key()
}

pub(crate) fn intruder_private() -> RsaPrivateKey {
    RsaPrivateKey::from_pkcs8_pem(INTRUDER_KEY_PEM).unwrap()
}

pub(crate) fn recipient_private_pkcs1() -> RsaPrivateKey {
    RsaPrivateKey::from_pkcs1_pem(RECIPIENT_PKCS1_KEY_PEM).unwrap()
}
