use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::movie::Person;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub username: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
}

impl User {
    pub fn full_name(&self) -> String {
        let first = self.first_name.as_deref().unwrap_or("");
        let last = self.last_name.as_deref().unwrap_or("");
        let name = format!("{} {}", first, last).trim().to_string();
        if name.is_empty() {
            self.username.clone()
        } else {
            name
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Feature {
    #[serde(default)]
    pub id: Option<i64>,
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscriptionPlan {
    pub id: i64,
    pub name: String,
    /// Monthly price in dollars
    #[serde(default, deserialize_with = "super::decimal")]
    pub price: Option<f64>,
    #[serde(default)]
    pub features: Vec<Feature>,
}

impl SubscriptionPlan {
    pub fn display_price(&self) -> String {
        match self.price {
            Some(price) => format!("${:.2}/month", price),
            None => "Free".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(default)]
    pub id: Option<i64>,
    pub user: User,
    #[serde(default)]
    pub birth_date: Option<String>,
    #[serde(default)]
    pub avatar: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub subscription_plan: Option<SubscriptionPlan>,
    #[serde(default, deserialize_with = "super::lenient_vec")]
    pub followed_actors: Vec<Person>,
    #[serde(default, deserialize_with = "super::lenient_vec")]
    pub followed_directors: Vec<Person>,
}

impl UserProfile {
    pub fn username(&self) -> &str {
        &self.user.username
    }
}

/// Editable part of a profile, sent whole on update.
#[derive(Debug, Clone, Serialize)]
pub struct ProfileUpdate {
    pub user: User,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub birth_date: Option<String>,
}

impl From<&UserProfile> for ProfileUpdate {
    fn from(profile: &UserProfile) -> Self {
        Self {
            user: profile.user.clone(),
            birth_date: profile.birth_date.clone(),
        }
    }
}

/// Payload for `POST /accounts/register/`.
#[derive(Clone, Serialize)]
pub struct RegistrationProfile {
    pub username: String,
    pub password: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub birth_date: NaiveDate,
    pub subscription_plan: i64,
}

impl fmt::Debug for RegistrationProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistrationProfile")
            .field("username", &self.username)
            .field("email", &self.email)
            .field("first_name", &self.first_name)
            .field("last_name", &self.last_name)
            .field("birth_date", &self.birth_date)
            .field("subscription_plan", &self.subscription_plan)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_subscription_plans() {
        let json = r#"[{"id": 1, "name": "Basic", "price": "4.99",
                        "features": [{"description": "HD streaming"}]},
                       {"id": 2, "name": "Trial", "price": null, "features": []}]"#;

        let plans: Vec<SubscriptionPlan> = serde_json::from_str(json).unwrap();
        assert_eq!(plans[0].display_price(), "$4.99/month");
        assert_eq!(plans[0].features[0].description, "HD streaming");
        assert_eq!(plans[1].display_price(), "Free");
    }

    #[test]
    fn test_registration_payload_shape() {
        let profile = RegistrationProfile {
            username: "neo".into(),
            password: "there-is-no-spoon".into(),
            email: "neo@zion.io".into(),
            first_name: "Thomas".into(),
            last_name: "Anderson".into(),
            birth_date: NaiveDate::from_ymd_opt(1971, 9, 13).unwrap(),
            subscription_plan: 2,
        };

        let value = serde_json::to_value(&profile).unwrap();
        assert_eq!(value["birth_date"], "1971-09-13");
        assert_eq!(value["subscription_plan"], 2);
        assert_eq!(value["password"], "there-is-no-spoon");

        let debug = format!("{:?}", profile);
        assert!(!debug.contains("there-is-no-spoon"));
    }

    #[test]
    fn test_full_name_falls_back_to_username() {
        let user = User {
            username: "neo".into(),
            email: None,
            first_name: None,
            last_name: None,
        };
        assert_eq!(user.full_name(), "neo");
    }
}
