//! bcrypt password hashing and the forgotten-password email.

use std::sync::LazyLock;

use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig};
use base64::engine::DecodePaddingMode;
use base64::Engine;
use bcrypt::{BcryptError, Version};
use galleon_core::models::User;
use galleon_core::{AppError, TimedSigner, UrlGenerator};
use galleon_services::Mailer;
use regex::{Captures, Regex};
use subtle::ConstantTimeEq;

use super::VERIFY_FORGOT_PASSWORD;

/// Cost of the throwaway hashes used to compare in roughly constant time
const COMPARE_COST: u32 = 5;

/// Namespace of the signer used for password reset tokens
pub const FP_TOKEN_NAMESPACE: &str = "mail_verification_token";

const FP_EMAIL_TEMPLATE: &str = include_str!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/templates/galleon/plugins/basic_auth/fp_verification_email.txt"
));

static PLACEHOLDER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{(site_name|username|verification_url)\}").expect("valid placeholder regex")
});

/// bcrypt's own base64 flavour; the 22-char salt carries 4 padding bits.
static BCRYPT_B64: LazyLock<GeneralPurpose> = LazyLock::new(|| {
    GeneralPurpose::new(
        &alphabet::BCRYPT,
        GeneralPurposeConfig::new()
            .with_encode_padding(false)
            .with_decode_allow_trailing_bits(true)
            .with_decode_padding_mode(DecodePaddingMode::RequireNone),
    )
});

#[derive(Debug, thiserror::Error)]
pub enum PasswordError {
    #[error("stored password hash is malformed")]
    InvalidHash,
    #[error(transparent)]
    Bcrypt(#[from] BcryptError),
}

impl From<PasswordError> for AppError {
    fn from(err: PasswordError) -> Self {
        AppError::PasswordHash(err.to_string())
    }
}

fn salted(raw_pass: &str, extra_salt: Option<&str>) -> String {
    match extra_salt {
        Some(extra) if !extra.is_empty() => format!("{}:{}", extra, raw_pass),
        _ => raw_pass.to_string(),
    }
}

/// Version, cost and salt of a stored `$2b$12$<salt><hash>` string
fn parse_stored_hash(stored_hash: &str) -> Result<(Version, u32, [u8; 16]), PasswordError> {
    let invalid = || PasswordError::InvalidHash;

    let mut parts = stored_hash.split('$');
    if parts.next() != Some("") {
        return Err(invalid());
    }
    let version = match parts.next() {
        Some("2a") => Version::TwoA,
        Some("2b") => Version::TwoB,
        Some("2x") => Version::TwoX,
        Some("2y") => Version::TwoY,
        _ => return Err(invalid()),
    };
    let cost: u32 = parts.next().and_then(|c| c.parse().ok()).ok_or_else(invalid)?;
    let rest = parts.next().ok_or_else(invalid)?;
    if parts.next().is_some() || rest.len() != 53 || !rest.is_ascii() {
        return Err(invalid());
    }

    let salt: [u8; 16] = BCRYPT_B64
        .decode(&rest[..22])
        .map_err(|_| invalid())?
        .try_into()
        .map_err(|_| invalid())?;
    Ok((version, cost, salt))
}

/// Hash a new password with `cost`, prefixing `extra_salt` when given.
pub fn bcrypt_gen_password_hash(
    raw_pass: &str,
    extra_salt: Option<&str>,
    cost: u32,
) -> Result<String, PasswordError> {
    Ok(bcrypt::hash(salted(raw_pass, extra_salt), cost)?)
}

/// Check `raw_pass` against `stored_hash`.
///
/// The candidate is hashed with the stored salt and cost. Both hashes are then
/// hashed again under one fresh random salt before comparing, so the
/// comparison time says nothing about how much of the stored hash matched.
pub fn bcrypt_check_password(
    raw_pass: &str,
    stored_hash: &str,
    extra_salt: Option<&str>,
) -> Result<bool, PasswordError> {
    let (version, cost, salt) = parse_stored_hash(stored_hash)?;
    let hashed_pass =
        bcrypt::hash_with_salt(salted(raw_pass, extra_salt), cost, salt)?.format_for_version(version);

    let rand_salt: [u8; 16] = rand::random();
    let randplus_stored_hash =
        bcrypt::hash_with_salt(stored_hash, COMPARE_COST, rand_salt)?.format_for_version(Version::TwoB);
    let randplus_hashed_pass =
        bcrypt::hash_with_salt(&hashed_pass, COMPARE_COST, rand_salt)?.format_for_version(Version::TwoB);

    Ok(randplus_stored_hash
        .as_bytes()
        .ct_eq(randplus_hashed_pass.as_bytes())
        .into())
}

/// Burn roughly the time of [`bcrypt_check_password`] without checking anything.
pub fn fake_login_attempt() {
    let rand_salt: [u8; 16] = rand::random();
    let hash = |input: String| {
        bcrypt::hash_with_salt(input, COMPARE_COST, rand_salt)
            .map(|parts| parts.format_for_version(Version::TwoB))
            .unwrap_or_default()
    };

    let hashed_pass = hash(rand::random::<f64>().to_string());
    let randplus_stored_hash = hash(rand::random::<f64>().to_string());
    let randplus_hashed_pass = hash(hashed_pass);

    std::hint::black_box(randplus_stored_hash == randplus_hashed_pass);
}

/// Fill the email template in one pass, so substituted values are never re-expanded.
fn render_fp_email(site_name: &str, username: &str, verification_url: &str) -> String {
    PLACEHOLDER_RE
        .replace_all(FP_EMAIL_TEMPLATE, |caps: &Captures| match &caps[1] {
            "site_name" => site_name.to_string(),
            "username" => username.to_string(),
            _ => verification_url.to_string(),
        })
        .into_owned()
}

/// Email `user` a signed link for choosing a new password.
#[tracing::instrument(skip_all, fields(user_id = user.id))]
pub async fn send_fp_verification_email(
    user: &User,
    signer: &TimedSigner,
    urlgen: &UrlGenerator,
    mailer: &Mailer,
    site_name: &str,
) -> Result<(), AppError> {
    let fp_verification_key = signer.dumps(&user.id)?;
    let verification_url = format!(
        "{}?token={}",
        urlgen.url_for(VERIFY_FORGOT_PASSWORD, &[], true)?,
        fp_verification_key
    );

    let body = render_fp_email(site_name, &user.username, &verification_url);
    mailer
        .send_email(
            mailer.sender_address(),
            std::slice::from_ref(&user.email),
            &format!("{} - Change forgotten password!", site_name),
            &body,
        )
        .await?;

    tracing::info!("Password reset email sent");
    Ok(())
}
