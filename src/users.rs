use crate::database::UserDb;
use crate::error::{ServiceError, ServiceResult};
use crate::model::User;
use log::info;
use std::collections::BTreeSet;
use validator::Validate;

/// Validated create/read/update on top of a user store.
pub struct UserService<'a, D> {
    db: &'a D,
}

impl<'a, D: UserDb> UserService<'a, D> {
    pub fn new(db: &'a D) -> Self {
        UserService { db }
    }

    pub fn find_all(&self) -> ServiceResult<Vec<User>> {
        Ok(self.db.all_users()?)
    }

    pub fn get_by_id(&self, id: u64) -> ServiceResult<User> {
        self.db
            .get_user(id)?
            .ok_or_else(|| ServiceError::user_not_found(id))
    }

    pub fn create(&self, user: User) -> ServiceResult<User> {
        user.validate()?;
        let user = User {
            id: None,
            friends: BTreeSet::new(),
            ..user.with_default_name()
        };
        let user = self.db.add_user(user)?;
        info!("Created user {} with id {:?}", user.login, user.id);
        Ok(user)
    }

    pub fn update(&self, user: User) -> ServiceResult<User> {
        let id = user
            .id
            .ok_or_else(|| ServiceError::validation("id must be specified"))?;
        user.validate()?;
        let user = self
            .db
            .update_user(&user.with_default_name())?
            .ok_or_else(|| ServiceError::user_not_found(id))?;
        info!("Updated user {}", id);
        Ok(user)
    }
}

/// Symmetric friend edges between users.
pub struct FriendService<'a, D> {
    db: &'a D,
}

impl<'a, D: UserDb> FriendService<'a, D> {
    pub fn new(db: &'a D) -> Self {
        FriendService { db }
    }

    fn missing(&self, a: u64, b: u64) -> ServiceError {
        match self.db.get_user(a) {
            Ok(Some(_)) => ServiceError::user_not_found(b),
            Ok(None) => ServiceError::user_not_found(a),
            Err(err) => err.into(),
        }
    }

    pub fn add_friend(&self, id: u64, friend_id: u64) -> ServiceResult<()> {
        if id == friend_id {
            return Err(ServiceError::validation("a user cannot befriend themselves"));
        }
        self.db
            .edit_user_pair(id, friend_id, |user, friend| {
                user.friends.insert(friend_id);
                friend.friends.insert(id);
            })?
            .ok_or_else(|| self.missing(id, friend_id))?;
        info!("User {} and user {} are now friends", id, friend_id);
        Ok(())
    }

    pub fn remove_friend(&self, id: u64, friend_id: u64) -> ServiceResult<()> {
        self.db
            .edit_user_pair(id, friend_id, |user, friend| {
                user.friends.remove(&friend_id);
                friend.friends.remove(&id);
            })?
            .ok_or_else(|| self.missing(id, friend_id))?;
        info!("User {} and user {} are no longer friends", id, friend_id);
        Ok(())
    }

    fn resolve<'i, I>(&self, ids: I) -> ServiceResult<Vec<User>>
    where
        I: IntoIterator<Item = &'i u64>,
    {
        ids.into_iter()
            .map(|&id| {
                self.db
                    .get_user(id)?
                    .ok_or_else(|| ServiceError::user_not_found(id))
            })
            .collect()
    }

    fn user(&self, id: u64) -> ServiceResult<User> {
        self.db
            .get_user(id)?
            .ok_or_else(|| ServiceError::user_not_found(id))
    }

    pub fn get_friends(&self, id: u64) -> ServiceResult<Vec<User>> {
        let user = self.user(id)?;
        self.resolve(&user.friends)
    }

    pub fn get_common_friends(&self, id: u64, other_id: u64) -> ServiceResult<Vec<User>> {
        let user = self.user(id)?;
        let other = self.user(other_id)?;
        self.resolve(user.friends.intersection(&other.friends))
    }
}
