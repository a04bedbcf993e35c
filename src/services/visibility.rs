/// Visibility resolution for posts
///
/// Pure decision logic, no I/O. Every service operation funnels its
/// authorization question through these functions so each rule stays
/// independently testable.
use uuid::Uuid;

use crate::models::{Identity, Post};

/// Listing scope for a caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostFilter {
    /// Superusers see every post.
    All,
    /// Everyone else sees public posts plus posts shared with them.
    PublicOrSharedWith(Uuid),
}

/// May `viewer` see `post`?
///
/// Public posts are visible to anyone, authenticated or not. Private posts
/// are visible to the author, explicitly shared users, and superusers.
/// The share set is inert while a post is public.
pub fn can_view(viewer: Option<&Identity>, post: &Post, shared_with: &[Uuid]) -> bool {
    if post.is_public {
        return true;
    }
    let viewer = match viewer {
        Some(viewer) => viewer,
        None => return false,
    };
    viewer.id == post.author_id || shared_with.contains(&viewer.id) || viewer.is_superuser
}

/// Listing filter for `viewer`. A post matching both the public and the
/// shared-with clause must appear once; the storage query guarantees that.
pub fn list_filter(viewer: &Identity) -> PostFilter {
    if viewer.is_superuser {
        PostFilter::All
    } else {
        PostFilter::PublicOrSharedWith(viewer.id)
    }
}

/// Only staff users create posts.
pub fn can_create(viewer: &Identity) -> bool {
    viewer.is_staff
}

/// Only the author or a superuser may update or delete a post.
pub fn can_modify(viewer: &Identity, post: &Post) -> bool {
    viewer.id == post.author_id || viewer.is_superuser
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn user(is_staff: bool, is_superuser: bool) -> Identity {
        Identity {
            id: Uuid::new_v4(),
            is_staff,
            is_superuser,
        }
    }

    fn post(author_id: Uuid, is_public: bool) -> Post {
        Post {
            id: Uuid::new_v4(),
            author_id,
            title: "title".to_string(),
            content: "content".to_string(),
            is_public,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn public_posts_are_visible_to_anyone() {
        let author = user(true, false);
        let p = post(author.id, true);
        let stranger = user(false, false);

        assert!(can_view(None, &p, &[]));
        assert!(can_view(Some(&stranger), &p, &[]));
        assert!(can_view(Some(&author), &p, &[]));
    }

    #[test]
    fn private_posts_hidden_from_anonymous() {
        let author = user(true, false);
        let p = post(author.id, false);

        assert!(!can_view(None, &p, &[]));
        // Even when shared rows exist, anonymous callers see nothing.
        assert!(!can_view(None, &p, &[Uuid::new_v4()]));
    }

    #[test]
    fn private_posts_visible_to_author_shared_and_superuser() {
        let author = user(true, false);
        let shared = user(false, false);
        let superuser = user(false, true);
        let stranger = user(false, false);
        let p = post(author.id, false);

        assert!(can_view(Some(&author), &p, &[shared.id]));
        assert!(can_view(Some(&shared), &p, &[shared.id]));
        assert!(can_view(Some(&superuser), &p, &[shared.id]));
        assert!(!can_view(Some(&stranger), &p, &[shared.id]));
    }

    #[test]
    fn share_set_is_inert_for_public_posts() {
        let author = user(true, false);
        let p = post(author.id, true);
        let stranger = user(false, false);

        assert!(can_view(Some(&stranger), &p, &[Uuid::new_v4()]));
    }

    #[test]
    fn superusers_list_everything() {
        let superuser = user(false, true);
        let regular = user(true, false);

        assert_eq!(list_filter(&superuser), PostFilter::All);
        assert_eq!(
            list_filter(&regular),
            PostFilter::PublicOrSharedWith(regular.id)
        );
    }

    #[test]
    fn only_staff_create() {
        assert!(can_create(&user(true, false)));
        assert!(!can_create(&user(false, false)));
        // Superuser without the staff attribute still cannot create.
        assert!(!can_create(&user(false, true)));
    }

    #[test]
    fn author_and_superuser_modify() {
        let author = user(true, false);
        let superuser = user(false, true);
        let stranger = user(true, false);
        let p = post(author.id, false);

        assert!(can_modify(&author, &p));
        assert!(can_modify(&superuser, &p));
        assert!(!can_modify(&stranger, &p));
    }
}
