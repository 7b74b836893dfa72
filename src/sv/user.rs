use crate::{entity::user, prelude::*, utils};

pub struct User<'a> {
  db: &'a DatabaseConnection,
}

impl<'a> User<'a> {
  pub fn new(db: &'a DatabaseConnection) -> Self {
    Self { db }
  }

  pub async fn create(
    &self,
    name: &str,
    email: &str,
    avatar_url: Option<String>,
  ) -> Result<user::Model> {
    let name = name.trim();
    let email = email.trim().to_lowercase();

    if name.is_empty() {
      return Err(Error::InvalidArgs("Name is required".into()));
    }
    if !email.contains('@') {
      return Err(Error::InvalidArgs("Invalid email".into()));
    }

    let taken = user::Entity::find()
      .filter(user::Column::Email.eq(&email))
      .one(self.db)
      .await?;
    if taken.is_some() {
      return Err(Error::InvalidArgs("Email already registered".into()));
    }

    let user = user::ActiveModel {
      id: NotSet,
      name: Set(name.to_string()),
      email: Set(email),
      avatar_url: Set(avatar_url),
      created_at: Set(utils::now()),
    };

    Ok(user.insert(self.db).await?)
  }

  pub async fn by_id(&self, id: i32) -> Result<Option<user::Model>> {
    Ok(user::Entity::find_by_id(id).one(self.db).await?)
  }

  pub async fn get(&self, id: i32) -> Result<user::Model> {
    self.by_id(id).await?.ok_or(Error::UserNotFound)
  }

  pub async fn by_ids(&self, ids: &[i32]) -> Result<Vec<user::Model>> {
    Ok(
      user::Entity::find()
        .filter(user::Column::Id.is_in(ids.iter().copied()))
        .all(self.db)
        .await?,
    )
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::sv::test_utils::test_db;

  #[tokio::test]
  async fn test_create_user() {
    let db = test_db::setup().await;

    let user = User::new(&db)
      .create(" Linh ", "Linh@Example.com", None)
      .await
      .unwrap();

    assert_eq!(user.name, "Linh");
    assert_eq!(user.email, "linh@example.com");
  }

  #[tokio::test]
  async fn test_duplicate_email() {
    let db = test_db::setup().await;
    let sv = User::new(&db);

    sv.create("A", "a@example.com", None).await.unwrap();
    let result = sv.create("B", "A@example.com", None).await;

    assert!(matches!(result, Err(Error::InvalidArgs(_))));
  }

  #[tokio::test]
  async fn test_missing_user() {
    let db = test_db::setup().await;
    assert!(matches!(User::new(&db).get(42).await, Err(Error::UserNotFound)));
  }
}
