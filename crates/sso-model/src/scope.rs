//! Standard OpenID Connect scope and claim names.

/// `openid` scope.
pub const OPENID: &str = "openid";
/// `profile` scope.
pub const PROFILE: &str = "profile";
/// `email` scope.
pub const EMAIL: &str = "email";
/// `phone` scope.
pub const PHONE: &str = "phone";
/// `address` scope.
pub const ADDRESS: &str = "address";
/// `offline_access` scope.
pub const OFFLINE_ACCESS: &str = "offline_access";

/// Standard claim names.
pub mod claims {
    /// Subject identifier.
    pub const SUBJECT: &str = "sub";
    /// Full name.
    pub const NAME: &str = "name";
    /// Given name.
    pub const GIVEN_NAME: &str = "given_name";
    /// Family name.
    pub const FAMILY_NAME: &str = "family_name";
    /// Middle name.
    pub const MIDDLE_NAME: &str = "middle_name";
    /// Casual name.
    pub const NICKNAME: &str = "nickname";
    /// Preferred username.
    pub const PREFERRED_USERNAME: &str = "preferred_username";
    /// Profile page URL.
    pub const PROFILE: &str = "profile";
    /// Picture URL.
    pub const PICTURE: &str = "picture";
    /// Web site URL.
    pub const WEBSITE: &str = "website";
    /// Gender.
    pub const GENDER: &str = "gender";
    /// Birth date.
    pub const BIRTHDATE: &str = "birthdate";
    /// Time zone.
    pub const ZONEINFO: &str = "zoneinfo";
    /// Locale.
    pub const LOCALE: &str = "locale";
    /// Last profile update time.
    pub const UPDATED_AT: &str = "updated_at";
    /// Email address.
    pub const EMAIL: &str = "email";
    /// Email verification flag.
    pub const EMAIL_VERIFIED: &str = "email_verified";
    /// Phone number.
    pub const PHONE_NUMBER: &str = "phone_number";
    /// Phone verification flag.
    pub const PHONE_NUMBER_VERIFIED: &str = "phone_number_verified";
    /// Postal address (JSON object).
    pub const ADDRESS: &str = "address";
}
