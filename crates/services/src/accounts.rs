//! Accounts: signup, login, and profile pages.

use std::sync::Arc;

use domains::{
    validate_email, validate_person_name, validate_signature, validate_username, AccountUpdate,
    Actor, DomainError, DomainResult, NewUser, PasswordHasher, Post, PostRepository,
    ProfileRepository, ProfileUpdate, ReplyRepository, User, UserProfile, UserRepository,
    PASSWORD_MIN_CHARS, RECENT_POSTS_ON_PROFILE,
};
use uuid::Uuid;

/// Signup form input.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SignupRequest {
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub password1: String,
    pub password2: String,
    pub agree_terms: bool,
}

/// Everything the profile page shows.
#[derive(Debug, Clone)]
pub struct ProfilePage {
    pub user: User,
    pub profile: UserProfile,
    /// Live counts, independent of the denormalized profile counters
    pub posts_count: i64,
    pub replies_count: i64,
    pub recent_posts: Vec<Post>,
    pub is_own_profile: bool,
}

#[derive(Clone)]
pub struct AccountService {
    users: Arc<dyn UserRepository>,
    profiles: Arc<dyn ProfileRepository>,
    posts: Arc<dyn PostRepository>,
    replies: Arc<dyn ReplyRepository>,
    hasher: Arc<dyn PasswordHasher>,
}

impl AccountService {
    pub fn new(
        users: Arc<dyn UserRepository>,
        profiles: Arc<dyn ProfileRepository>,
        posts: Arc<dyn PostRepository>,
        replies: Arc<dyn ReplyRepository>,
        hasher: Arc<dyn PasswordHasher>,
    ) -> Self {
        Self { users, profiles, posts, replies, hasher }
    }

    pub async fn signup(&self, req: SignupRequest) -> DomainResult<User> {
        let username = req.username.trim().to_string();
        let email = normalize_email(&req.email);
        let first_name = req.first_name.trim().to_string();
        let last_name = req.last_name.trim().to_string();

        validate_username(&username)?;
        if let Some(email) = &email {
            validate_email(email)?;
        }
        validate_person_name("first name", &first_name)?;
        validate_person_name("last name", &last_name)?;
        if req.password1.chars().count() < PASSWORD_MIN_CHARS {
            return Err(DomainError::Validation(format!(
                "password must be at least {} characters",
                PASSWORD_MIN_CHARS
            )));
        }
        if req.password1 != req.password2 {
            return Err(DomainError::Validation("the two passwords do not match".into()));
        }
        if !req.agree_terms {
            return Err(DomainError::Validation("you must agree to the terms of service".into()));
        }
        if self.users.username_taken(&username).await? {
            return Err(DomainError::Validation("this username is already taken".into()));
        }
        if let Some(email) = &email {
            if self.users.email_taken(email, None).await? {
                return Err(DomainError::Validation("this email is already in use".into()));
            }
        }

        let password_hash = self.hasher.hash_password(&req.password1).await?;
        let user = self
            .users
            .create_user(NewUser {
                username,
                email,
                first_name,
                last_name,
                password_hash,
                is_staff: false,
            })
            .await?;
        self.ensure_profile_best_effort(user.id).await;
        tracing::info!(user_id = %user.id, username = %user.username, "user signed up");
        Ok(user)
    }

    /// Creates an account directly, bypassing the signup form (seeding).
    pub async fn create_account(&self, username: &str, password: &str, is_staff: bool) -> DomainResult<User> {
        validate_username(username)?;
        if let Some(existing) = self.users.find_user_by_username(username).await? {
            return Ok(existing);
        }
        let password_hash = self.hasher.hash_password(password).await?;
        let user = self
            .users
            .create_user(NewUser {
                username: username.to_string(),
                email: None,
                first_name: String::new(),
                last_name: String::new(),
                password_hash,
                is_staff,
            })
            .await?;
        self.ensure_profile_best_effort(user.id).await;
        tracing::info!(user_id = %user.id, username, is_staff, "account created");
        Ok(user)
    }

    /// Username or email plus password.
    pub async fn login(&self, login: &str, password: &str, ip: Option<&str>) -> DomainResult<User> {
        let rejected = || DomainError::Unauthorized("invalid username or password".into());
        let user = self
            .users
            .find_user_by_login(login.trim())
            .await?
            .ok_or_else(rejected)?;
        if !self.hasher.verify_password(password, &user.password_hash).await {
            tracing::info!(login = %login.trim(), "failed login attempt");
            return Err(rejected());
        }

        if let Err(e) = self.users.touch_last_login(user.id).await {
            tracing::warn!(user_id = %user.id, error = %e, "could not record last login");
        }
        if let Some(ip) = ip {
            if let Err(e) = self.profiles.record_login_ip(user.id, ip).await {
                tracing::warn!(user_id = %user.id, error = %e, "could not record login ip");
            }
        }
        tracing::info!(user_id = %user.id, "user logged in");
        Ok(user)
    }

    pub async fn find_user(&self, id: Uuid) -> DomainResult<Option<User>> {
        self.users.find_user(id).await
    }

    /// Profile page for `username`, or for the viewer when `None`.
    pub async fn profile_page(&self, viewer: &Actor, username: Option<&str>) -> DomainResult<ProfilePage> {
        let user = match username {
            Some(name) => self
                .users
                .find_user_by_username(name)
                .await?
                .ok_or_else(|| DomainError::not_found("User", name))?,
            None => self
                .users
                .find_user(viewer.user_id)
                .await?
                .ok_or_else(|| DomainError::not_found("User", viewer.user_id))?,
        };
        let profile = self.profiles.ensure_profile(user.id).await?;
        let posts_count = self.posts.count_posts_by_author(user.id).await?;
        let replies_count = self.replies.count_replies_by_author(user.id).await?;
        let recent_posts = self
            .posts
            .recent_posts_by_author(user.id, RECENT_POSTS_ON_PROFILE)
            .await?;
        Ok(ProfilePage {
            is_own_profile: user.id == viewer.user_id,
            user,
            profile,
            posts_count,
            replies_count,
            recent_posts,
        })
    }

    pub async fn update_profile(
        &self,
        actor: &Actor,
        account: AccountUpdate,
        profile: ProfileUpdate,
    ) -> DomainResult<(User, UserProfile)> {
        let first_name = account.first_name.trim().to_string();
        let last_name = account.last_name.trim().to_string();
        let email = account.email.as_deref().and_then(normalize_email);
        validate_person_name("first name", &first_name)?;
        validate_person_name("last name", &last_name)?;
        if let Some(email) = &email {
            validate_email(email)?;
            if self.users.email_taken(email, Some(actor.user_id)).await? {
                return Err(DomainError::Validation("this email is already in use".into()));
            }
        }
        let signature = profile.signature.trim().to_string();
        validate_signature(&signature)?;
        let avatar = profile
            .avatar
            .map(|a| a.trim().to_string())
            .filter(|a| !a.is_empty());

        let user = self
            .users
            .update_account(actor.user_id, AccountUpdate { first_name, last_name, email })
            .await?
            .ok_or_else(|| DomainError::not_found("User", actor.user_id))?;
        self.profiles.ensure_profile(actor.user_id).await?;
        let profile = self
            .profiles
            .update_profile(
                actor.user_id,
                ProfileUpdate { avatar, bio: profile.bio.trim().to_string(), signature },
            )
            .await?;
        tracing::info!(user_id = %actor.user_id, "profile updated");
        Ok((user, profile))
    }

    pub async fn ensure_profile(&self, user_id: Uuid) -> DomainResult<UserProfile> {
        self.profiles.ensure_profile(user_id).await
    }

    // Profile creation must not fail the signup; the profile is ensured
    // again on every access point.
    async fn ensure_profile_best_effort(&self, user_id: Uuid) {
        if let Err(e) = self.profiles.ensure_profile(user_id).await {
            tracing::warn!(%user_id, error = %e, "profile creation failed, continuing");
        }
    }
}

fn normalize_email(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use domains::{
        MockPasswordHasher, MockPostRepository, MockProfileRepository, MockReplyRepository,
        MockUserRepository,
    };

    fn request() -> SignupRequest {
        SignupRequest {
            username: "alice".into(),
            email: "alice@example.com".into(),
            first_name: String::new(),
            last_name: String::new(),
            password1: "correct horse".into(),
            password2: "correct horse".into(),
            agree_terms: true,
        }
    }

    fn user_from(new: NewUser) -> User {
        User {
            id: Uuid::now_v7(),
            username: new.username,
            email: new.email,
            first_name: new.first_name,
            last_name: new.last_name,
            password_hash: new.password_hash,
            is_staff: new.is_staff,
            created_at: Utc::now(),
            last_login_at: None,
        }
    }

    fn service(users: MockUserRepository, profiles: MockProfileRepository, hasher: MockPasswordHasher) -> AccountService {
        AccountService::new(
            Arc::new(users),
            Arc::new(profiles),
            Arc::new(MockPostRepository::new()),
            Arc::new(MockReplyRepository::new()),
            Arc::new(hasher),
        )
    }

    fn hasher() -> MockPasswordHasher {
        let mut hasher = MockPasswordHasher::new();
        hasher.expect_hash_password().returning(|p| Ok(format!("hashed:{}", p)));
        hasher
    }

    #[tokio::test]
    async fn signup_survives_profile_creation_failure() {
        let mut users = MockUserRepository::new();
        users.expect_username_taken().returning(|_| Ok(false));
        users.expect_email_taken().returning(|_, _| Ok(false));
        users.expect_create_user().returning(|new| Ok(user_from(new)));
        let mut profiles = MockProfileRepository::new();
        profiles.expect_ensure_profile()
            .times(1)
            .returning(|_| Err(DomainError::Internal("locked".into())));

        let user = service(users, profiles, hasher()).signup(request()).await.unwrap();
        assert_eq!(user.username, "alice");
        assert_eq!(user.password_hash, "hashed:correct horse");
    }

    #[tokio::test]
    async fn duplicate_username_is_rejected() {
        let mut users = MockUserRepository::new();
        users.expect_username_taken().returning(|_| Ok(true));
        users.expect_create_user().never();

        let err = service(users, MockProfileRepository::new(), MockPasswordHasher::new())
            .signup(request())
            .await
            .unwrap_err();
        assert_eq!(err, DomainError::Validation("this username is already taken".into()));
    }

    #[tokio::test]
    async fn duplicate_email_is_rejected() {
        let mut users = MockUserRepository::new();
        users.expect_username_taken().returning(|_| Ok(false));
        users.expect_email_taken().returning(|_, _| Ok(true));
        users.expect_create_user().never();

        let err = service(users, MockProfileRepository::new(), MockPasswordHasher::new())
            .signup(request())
            .await
            .unwrap_err();
        assert_eq!(err, DomainError::Validation("this email is already in use".into()));
    }

    #[tokio::test]
    async fn terms_must_be_accepted_and_passwords_match() {
        let svc = service(MockUserRepository::new(), MockProfileRepository::new(), MockPasswordHasher::new());

        let no_terms = SignupRequest { agree_terms: false, ..request() };
        assert!(matches!(svc.signup(no_terms).await, Err(DomainError::Validation(_))));

        let mismatch = SignupRequest { password2: "something else".into(), ..request() };
        assert!(matches!(svc.signup(mismatch).await, Err(DomainError::Validation(_))));

        let short = SignupRequest { password1: "short".into(), password2: "short".into(), ..request() };
        assert!(matches!(svc.signup(short).await, Err(DomainError::Validation(_))));
    }

    #[tokio::test]
    async fn empty_email_is_not_checked_for_duplicates() {
        let mut users = MockUserRepository::new();
        users.expect_username_taken().returning(|_| Ok(false));
        users.expect_email_taken().never();
        users.expect_create_user()
            .withf(|new| new.email.is_none())
            .returning(|new| Ok(user_from(new)));
        let mut profiles = MockProfileRepository::new();
        profiles.expect_ensure_profile().returning(|user_id| {
            let now = Utc::now();
            Ok(UserProfile {
                user_id,
                avatar: None,
                bio: String::new(),
                signature: String::new(),
                post_count: 0,
                reply_count: 0,
                reputation: 0,
                last_login_ip: None,
                created_at: now,
                updated_at: now,
            })
        });

        let req = SignupRequest { email: "  ".into(), ..request() };
        service(users, profiles, hasher()).signup(req).await.unwrap();
    }

    #[tokio::test]
    async fn wrong_password_is_unauthorized() {
        let mut users = MockUserRepository::new();
        users.expect_find_user_by_login().returning(|login| {
            Ok(Some(user_from(NewUser {
                username: login.to_string(),
                email: None,
                first_name: String::new(),
                last_name: String::new(),
                password_hash: "stored".into(),
                is_staff: false,
            })))
        });
        users.expect_touch_last_login().never();
        let mut hasher = MockPasswordHasher::new();
        hasher.expect_verify_password().returning(|_, _| false);

        let err = service(users, MockProfileRepository::new(), hasher)
            .login("alice", "nope", Some("127.0.0.1"))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Unauthorized(_)));
    }
}
