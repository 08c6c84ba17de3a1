use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

use crate::database::models::{Education, Experience, Post, Profile, User, UserSummary};
use crate::database::{Repository, StoreError};
use crate::filter::Filter;
use crate::types::UserId;
use crate::validation::{non_blank, parse_date, FieldErrors};

#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("Validation failed: {0}")]
    Validation(FieldErrors),

    #[error("There is no profile for this user")]
    NotFound,

    #[error("Experience entry not found")]
    ExperienceNotFound,

    #[error("Education entry not found")]
    EducationNotFound,

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Skills arrive either as one comma separated string or as a list.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum SkillsInput {
    Delimited(String),
    List(Vec<String>),
}

impl SkillsInput {
    pub fn to_list(&self) -> Vec<String> {
        let parts: Vec<&str> = match self {
            SkillsInput::Delimited(s) => s.split(',').collect(),
            SkillsInput::List(items) => items.iter().map(String::as_str).collect(),
        };
        parts
            .into_iter()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    }
}

/// Profile fields from a create-or-update request. Absent or blank fields
/// leave the stored value untouched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileInput {
    pub company: Option<String>,
    pub website: Option<String>,
    pub location: Option<String>,
    pub bio: Option<String>,
    pub status: Option<String>,
    pub github_username: Option<String>,
    pub skills: Option<SkillsInput>,
    pub youtube: Option<String>,
    pub twitter: Option<String>,
    pub facebook: Option<String>,
    pub linkedin: Option<String>,
    pub instagram: Option<String>,
}

impl ProfileInput {
    pub fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        errors.require("status", self.status.as_deref(), "Status is required");
        errors.check(
            self.skills.as_ref().is_some_and(|s| !s.to_list().is_empty()),
            "skills",
            "Skills is required",
        );
        errors.into_result()
    }

    pub fn apply_to(&self, profile: &mut Profile) {
        fn merge(target: &mut Option<String>, value: &Option<String>) {
            if let Some(v) = non_blank(value.as_deref()) {
                *target = Some(v);
            }
        }

        merge(&mut profile.company, &self.company);
        merge(&mut profile.website, &self.website);
        merge(&mut profile.location, &self.location);
        merge(&mut profile.bio, &self.bio);
        merge(&mut profile.status, &self.status);
        merge(&mut profile.github_username, &self.github_username);

        if let Some(skills) = self.skills.as_ref().map(SkillsInput::to_list) {
            if !skills.is_empty() {
                profile.skills = skills;
            }
        }

        merge(&mut profile.social.youtube, &self.youtube);
        merge(&mut profile.social.twitter, &self.twitter);
        merge(&mut profile.social.facebook, &self.facebook);
        merge(&mut profile.social.linkedin, &self.linkedin);
        merge(&mut profile.social.instagram, &self.instagram);
    }
}

fn optional_date(errors: &mut FieldErrors, field: &str, value: Option<&str>) -> Option<chrono::NaiveDate> {
    let raw = non_blank(value)?;
    let parsed = parse_date(&raw);
    if parsed.is_none() {
        errors.push(field, &format!("{} must be a valid date", field));
    }
    parsed
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExperienceInput {
    pub title: Option<String>,
    pub company: Option<String>,
    pub location: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
    pub current: Option<bool>,
    pub description: Option<String>,
}

impl ExperienceInput {
    /// Validate and build a new entry with a fresh id.
    pub fn into_entry(self) -> Result<Experience, FieldErrors> {
        let mut errors = FieldErrors::new();
        errors.require("title", self.title.as_deref(), "Title is required");
        errors.require("company", self.company.as_deref(), "Company is required");
        errors.require("from", self.from.as_deref(), "From date is required");
        let from = optional_date(&mut errors, "from", self.from.as_deref());
        let to = optional_date(&mut errors, "to", self.to.as_deref());
        errors.into_result()?;

        Ok(Experience {
            id: Uuid::new_v4(),
            title: non_blank(self.title.as_deref()).unwrap_or_default(),
            company: non_blank(self.company.as_deref()).unwrap_or_default(),
            location: non_blank(self.location.as_deref()),
            from: from.unwrap_or_default(),
            to,
            current: self.current.unwrap_or(false),
            description: non_blank(self.description.as_deref()),
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EducationInput {
    pub school: Option<String>,
    pub degree: Option<String>,
    pub field_of_study: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
    pub current: Option<bool>,
    pub description: Option<String>,
}

impl EducationInput {
    pub fn into_entry(self) -> Result<Education, FieldErrors> {
        let mut errors = FieldErrors::new();
        errors.require("school", self.school.as_deref(), "School is required");
        errors.require("degree", self.degree.as_deref(), "Degree is required");
        errors.require("field_of_study", self.field_of_study.as_deref(), "Field of study is required");
        errors.require("from", self.from.as_deref(), "From date is required");
        let from = optional_date(&mut errors, "from", self.from.as_deref());
        let to = optional_date(&mut errors, "to", self.to.as_deref());
        errors.into_result()?;

        Ok(Education {
            id: Uuid::new_v4(),
            school: non_blank(self.school.as_deref()).unwrap_or_default(),
            degree: non_blank(self.degree.as_deref()).unwrap_or_default(),
            field_of_study: non_blank(self.field_of_study.as_deref()).unwrap_or_default(),
            from: from.unwrap_or_default(),
            to,
            current: self.current.unwrap_or(false),
            description: non_blank(self.description.as_deref()),
        })
    }
}

/// Profile as returned by the API, with the owner's current name and avatar.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProfileView {
    #[serde(flatten)]
    pub profile: Profile,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner: Option<UserSummary>,
}

/// Profiles keyed one-to-one by user, plus account removal.
#[derive(Clone)]
pub struct ProfileService {
    profiles: Repository<Profile>,
    users: Repository<User>,
    posts: Repository<Post>,
}

impl ProfileService {
    pub fn new(profiles: Repository<Profile>, users: Repository<User>, posts: Repository<Post>) -> Self {
        Self { profiles, users, posts }
    }

    /// Create the caller's profile, or merge the provided fields into it.
    pub async fn upsert(&self, user_id: UserId, input: ProfileInput) -> Result<ProfileView, ProfileError> {
        input.validate().map_err(ProfileError::Validation)?;

        if let Some(updated) = self.merge_existing(user_id, &input).await? {
            info!("Updated profile for user {}", user_id);
            return self.view(updated).await;
        }

        let mut profile = Profile::new(user_id);
        input.apply_to(&mut profile);

        match self.profiles.insert(profile).await {
            Ok(created) => {
                info!("Created profile for user {}", user_id);
                self.view(created).await
            }
            // Another request created it first; fold this one in as an update
            Err(StoreError::UniqueViolation { .. }) => {
                let updated = self
                    .merge_existing(user_id, &input)
                    .await?
                    .ok_or(ProfileError::NotFound)?;
                self.view(updated).await
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn merge_existing(&self, user_id: UserId, input: &ProfileInput) -> Result<Option<Profile>, ProfileError> {
        let Some(existing) = self.find_for(user_id).await? else {
            return Ok(None);
        };
        self.profiles
            .update_with(existing.id, |profile: &mut Profile| -> Result<(), ProfileError> {
                input.apply_to(profile);
                Ok(())
            })
            .await
    }

    pub async fn get_by_user(&self, user_id: UserId) -> Result<ProfileView, ProfileError> {
        let profile = self.find_for(user_id).await?.ok_or(ProfileError::NotFound)?;
        self.view(profile).await
    }

    pub async fn list_all(&self) -> Result<Vec<ProfileView>, ProfileError> {
        let profiles = self.profiles.select_any(Filter::new()).await?;
        futures::future::try_join_all(profiles.into_iter().map(|p| self.view(p))).await
    }

    pub async fn add_experience(&self, user_id: UserId, input: ExperienceInput) -> Result<ProfileView, ProfileError> {
        let entry = input.into_entry().map_err(ProfileError::Validation)?;
        self.mutate_own(user_id, |profile| {
            profile.add_experience(entry.clone());
            Ok(())
        })
        .await
    }

    /// Remove an experience entry from the caller's own profile.
    pub async fn remove_experience(&self, user_id: UserId, entry_id: Uuid) -> Result<ProfileView, ProfileError> {
        self.mutate_own(user_id, |profile| {
            profile
                .remove_experience(entry_id)
                .map(|_| ())
                .ok_or(ProfileError::ExperienceNotFound)
        })
        .await
    }

    pub async fn add_education(&self, user_id: UserId, input: EducationInput) -> Result<ProfileView, ProfileError> {
        let entry = input.into_entry().map_err(ProfileError::Validation)?;
        self.mutate_own(user_id, |profile| {
            profile.add_education(entry.clone());
            Ok(())
        })
        .await
    }

    pub async fn remove_education(&self, user_id: UserId, entry_id: Uuid) -> Result<ProfileView, ProfileError> {
        self.mutate_own(user_id, |profile| {
            profile
                .remove_education(entry_id)
                .map(|_| ())
                .ok_or(ProfileError::EducationNotFound)
        })
        .await
    }

    /// Remove the user's posts, profile and account.
    pub async fn delete_cascade(&self, user_id: UserId) -> Result<(), ProfileError> {
        let by_user = Filter::new().where_eq("user", user_id);

        let posts = self.posts.delete_any(by_user.clone()).await?;
        let profiles = self.profiles.delete_any(by_user).await?;
        let removed = self.users.delete(user_id.as_uuid()).await?;

        info!(
            "Deleted user {} (account removed: {}, profiles: {}, posts: {})",
            user_id, removed, profiles, posts
        );
        Ok(())
    }

    /// Apply `mutate` to the caller's profile. Entry lookups happen only
    /// inside this profile, never across users.
    async fn mutate_own<F>(&self, user_id: UserId, mutate: F) -> Result<ProfileView, ProfileError>
    where
        F: FnMut(&mut Profile) -> Result<(), ProfileError> + Send,
    {
        let profile = self.find_for(user_id).await?.ok_or(ProfileError::NotFound)?;
        let updated = self
            .profiles
            .update_with(profile.id, mutate)
            .await?
            .ok_or(ProfileError::NotFound)?;
        self.view(updated).await
    }

    async fn find_for(&self, user_id: UserId) -> Result<Option<Profile>, StoreError> {
        self.profiles
            .select_one(Filter::new().where_eq("user", user_id))
            .await
    }

    async fn view(&self, profile: Profile) -> Result<ProfileView, ProfileError> {
        let owner = self
            .users
            .select_id(profile.user.as_uuid())
            .await?
            .as_ref()
            .map(UserSummary::from);
        Ok(ProfileView { profile, owner })
    }
}
