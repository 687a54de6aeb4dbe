use anyhow::{anyhow, bail};
use sandbox_core::provider::User;
use serde_json::{json, Map, Value};

pub const NORMAL_USER: &str = "100";
pub const CMS_TOKEN: &str = "cms-token";

/// Hard-coded CMS holding one user and a student card.
#[derive(Default, Clone, Debug)]
pub struct CmsStore;

impl CmsStore {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    pub fn user(&self, query: &str, token: &str) -> anyhow::Result<User> {
        check_token(token)?;
        if query != "email=foo%40bar.com" {
            bail!("user not found");
        }
        Ok(User {
            user_id: NORMAL_USER.into(),
            name: "Foo Bar".into(),
            email: "foo@bar.com".into(),
        })
    }

    pub fn subject_data(
        &self, scope: &str, user_id: &str, token: &str,
    ) -> anyhow::Result<Map<String, Value>> {
        check_token(token)?;
        if scope != "studentcards" || user_id != NORMAL_USER {
            bail!("record not found");
        }

        let record = json!({
            "userid": NORMAL_USER,
            "name": "Foo Bar",
            "studentid": "1234568",
            "university": "Faber College",
            "semester": "3",
            "created_at": "2024-01-01T00:00:00Z",
            "updated_at": "2024-01-01T00:00:00Z",
        });
        match record {
            Value::Object(map) => Ok(map),
            _ => Err(anyhow!("record is not an object")),
        }
    }
}

fn check_token(token: &str) -> anyhow::Result<()> {
    if token != CMS_TOKEN {
        bail!("invalid token");
    }
    Ok(())
}
