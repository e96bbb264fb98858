use axum::body::Bytes;
use social_feed::{
    app_state::AppState,
    config::Config,
    database::NewUser,
    forms::{MessageForm, PostForm, ProfileForm, RegisterForm},
    media::Upload,
    models::{NotificationType, Post, User},
    AppError,
};
use tempfile::TempDir;

async fn setup() -> (AppState, TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let config = Config::for_testing(dir.path().to_string_lossy().to_string());
    let state = AppState::new(config).await.unwrap();
    (state, dir)
}

async fn user(state: &AppState, username: &str) -> User {
    state
        .db
        .create_user(&NewUser {
            username: username.to_string(),
            email: format!("{}@example.com", username),
            first_name: String::new(),
            last_name: String::new(),
            password_hash: "not-a-real-hash".to_string(),
        })
        .await
        .unwrap()
}

fn png(name: &str) -> Upload {
    Upload {
        file_name: name.to_string(),
        bytes: Bytes::from_static(b"\x89PNG test image"),
    }
}

async fn post(state: &AppState, author: &User, caption: &str) -> Post {
    let form = PostForm {
        image: Some(png("photo.png")),
        caption: caption.to_string(),
    };
    state.social.create_post(author.id, &form).await.unwrap().unwrap()
}

#[tokio::test]
async fn test_follow_is_idempotent() {
    let (state, _dir) = setup().await;
    let alice = user(&state, "alice").await;
    let bob = user(&state, "bob").await;

    assert!(state.social.follow(alice.id, bob.id).await.unwrap());
    assert!(!state.social.follow(alice.id, bob.id).await.unwrap());

    let counts = state.db.follow_counts(bob.id).await.unwrap();
    assert_eq!(counts.followers, 1);
    assert_eq!(state.social.unread_notifications(bob.id).await.unwrap(), 1);

    assert!(state.social.unfollow(alice.id, bob.id).await.unwrap());
    assert!(!state.social.unfollow(alice.id, bob.id).await.unwrap());
    assert_eq!(state.db.follow_counts(bob.id).await.unwrap().followers, 0);
}

#[tokio::test]
async fn test_self_follow_is_ignored() {
    let (state, _dir) = setup().await;
    let alice = user(&state, "alice").await;

    assert!(!state.social.follow(alice.id, alice.id).await.unwrap());
    assert!(!state.social.is_following(alice.id, alice.id).await.unwrap());
    assert_eq!(state.social.unread_notifications(alice.id).await.unwrap(), 0);
}

#[tokio::test]
async fn test_like_toggle_twice_restores_state() {
    let (state, _dir) = setup().await;
    let alice = user(&state, "alice").await;
    let bob = user(&state, "bob").await;
    let p = post(&state, &bob, "sunset").await;

    let first = state.social.toggle_like(alice.id, p.id).await.unwrap();
    assert!(first.liked);
    assert_eq!(first.total_likes, 1);

    let second = state.social.toggle_like(alice.id, p.id).await.unwrap();
    assert!(!second.liked);
    assert_eq!(second.total_likes, 0);

    // liking your own post never notifies
    state.social.toggle_like(bob.id, p.id).await.unwrap();
    let notes = state.social.notifications(bob.id).await.unwrap();
    assert_eq!(notes.len(), 1);
    assert_eq!(notes[0].notification_type, NotificationType::Like);
    assert_eq!(notes[0].from_user_id, alice.id);
}

#[tokio::test]
async fn test_feed_contains_exactly_self_and_followed() {
    let (state, _dir) = setup().await;
    let alice = user(&state, "alice").await;
    let bob = user(&state, "bob").await;
    let carol = user(&state, "carol").await;

    state.social.follow(alice.id, bob.id).await.unwrap();
    let own = post(&state, &alice, "mine").await;
    let followed = post(&state, &bob, "bob's").await;
    post(&state, &carol, "stranger").await;

    let feed = state.social.feed(alice.id).await.unwrap();
    let ids: Vec<_> = feed.iter().map(|p| p.post.id).collect();
    assert_eq!(ids, vec![followed.id, own.id]);
    assert_eq!(feed[0].post.author_username, "bob");
}

#[tokio::test]
async fn test_create_post_stores_image() {
    let (state, dir) = setup().await;
    let alice = user(&state, "alice").await;

    let p = post(&state, &alice, "first").await;
    assert!(p.image.starts_with("posts/"));
    assert!(dir.path().join(&p.image).exists());

    let missing = PostForm { image: None, caption: "no image".into() };
    let errors = state.social.create_post(alice.id, &missing).await.unwrap().unwrap_err();
    assert_eq!(errors.field("image"), ["This field is required."]);
    assert_eq!(state.social.feed(alice.id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_blank_comment_is_rejected() {
    let (state, _dir) = setup().await;
    let alice = user(&state, "alice").await;
    let p = post(&state, &alice, "hi").await;

    let err = state.social.add_comment(alice.id, p.id, "   ").await.unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));
    assert!(state.social.post_detail(p.id, alice.id).await.unwrap().comments.is_empty());

    let err = state.social.add_comment(alice.id, 9999, "hello").await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn test_find_or_create_chat_is_stable() {
    let (state, _dir) = setup().await;
    let alice = user(&state, "alice").await;
    let bob = user(&state, "bob").await;
    let carol = user(&state, "carol").await;

    let first = state.chats.find_or_create_chat(alice.id, bob.id).await.unwrap();
    let again = state.chats.find_or_create_chat(alice.id, bob.id).await.unwrap();
    let reversed = state.chats.find_or_create_chat(bob.id, alice.id).await.unwrap();
    assert_eq!(first, again);
    assert_eq!(first, reversed);

    let other = state.chats.find_or_create_chat(alice.id, carol.id).await.unwrap();
    assert_ne!(first, other);
}

#[tokio::test]
async fn test_chat_is_private_to_participants() {
    let (state, _dir) = setup().await;
    let alice = user(&state, "alice").await;
    let bob = user(&state, "bob").await;
    let mallory = user(&state, "mallory").await;
    let chat_id = state.chats.find_or_create_chat(alice.id, bob.id).await.unwrap();

    let err = state.chats.chat_detail(chat_id, mallory.id).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));

    let form = MessageForm { text: "let me in".into(), image: None };
    let err = state.chats.send_message(chat_id, mallory.id, &form).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn test_messages_reorder_chat_list() {
    let (state, _dir) = setup().await;
    let alice = user(&state, "alice").await;
    let bob = user(&state, "bob").await;
    let carol = user(&state, "carol").await;

    let with_bob = state.chats.find_or_create_chat(alice.id, bob.id).await.unwrap();
    let with_carol = state.chats.find_or_create_chat(alice.id, carol.id).await.unwrap();

    let form = MessageForm { text: "hey bob".into(), image: None };
    state.chats.send_message(with_bob, alice.id, &form).await.unwrap().unwrap();

    let chats = state.chats.chat_list(alice.id).await.unwrap();
    assert_eq!(chats.len(), 2);
    assert_eq!(chats[0].chat.id, with_bob);
    assert_eq!(chats[0].other_username.as_deref(), Some("bob"));
    assert_eq!(chats[0].last_message.as_deref(), Some("hey bob"));
    assert_eq!(chats[1].chat.id, with_carol);
    assert_eq!(chats[1].last_message, None);

    let empty = MessageForm::default();
    let errors = state.chats.send_message(with_carol, alice.id, &empty).await.unwrap().unwrap_err();
    assert_eq!(errors.non_field().len(), 1);
}

#[tokio::test]
async fn test_share_post_sends_one_message() {
    let (state, _dir) = setup().await;
    let alice = user(&state, "alice").await;
    let bob = user(&state, "bob").await;
    let carol = user(&state, "carol").await;
    let p = post(&state, &bob, "hello").await;

    let chat_id = state.chats.share_post(alice.id, p.id, carol.id).await.unwrap();
    let detail = state.chats.chat_detail(chat_id, carol.id).await.unwrap();

    assert_eq!(detail.messages.len(), 1);
    let message = &detail.messages[0];
    assert_eq!(message.text, "Check out this post from bob: hello");
    assert_eq!(message.image.as_deref(), Some(p.image.as_str()));
    assert_eq!(message.sender_id, alice.id);
    assert_eq!(detail.other_user.map(|u| u.id), Some(alice.id));
}

#[tokio::test]
async fn test_notifications_capped_and_marked_read() {
    let (state, _dir) = setup().await;
    let alice = user(&state, "alice").await;
    let bob = user(&state, "bob").await;

    for _ in 0..55 {
        state
            .db
            .create_notification(bob.id, alice.id, NotificationType::Follow, None)
            .await
            .unwrap();
    }

    let shown = state.social.notifications(bob.id).await.unwrap();
    assert_eq!(shown.len(), 50);
    assert!(shown.iter().all(|n| !n.is_read));
    assert!(shown.windows(2).all(|w| (w[0].created_at, w[0].id) > (w[1].created_at, w[1].id)));

    // the five oldest were not displayed, so they stay unread
    assert_eq!(state.social.unread_notifications(bob.id).await.unwrap(), 5);

    let again = state.social.notifications(bob.id).await.unwrap();
    assert!(again.iter().all(|n| n.is_read));
}

#[tokio::test]
async fn test_search_excludes_viewer_and_matches_literally() {
    let (state, _dir) = setup().await;
    let alice = user(&state, "alice").await;
    user(&state, "alicia").await;
    user(&state, "al_bert").await;
    user(&state, "bob").await;

    let found = state.social.search(alice.id, "ALI").await.unwrap();
    let names: Vec<_> = found.iter().map(|u| u.username.as_str()).collect();
    assert_eq!(names, vec!["alicia"]);

    let found = state.social.search(alice.id, "_").await.unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].username, "al_bert");
}

#[tokio::test]
async fn test_alice_and_bob_scenario() {
    let (state, _dir) = setup().await;
    let alice = user(&state, "alice").await;
    let bob = user(&state, "bob").await;

    state.social.follow(alice.id, bob.id).await.unwrap();
    let hello = post(&state, &bob, "hello").await;
    assert!(state.social.feed(alice.id).await.unwrap().iter().any(|p| p.post.id == hello.id));

    state.social.add_comment(alice.id, hello.id, "nice!").await.unwrap();
    let outcome = state.social.toggle_like(alice.id, hello.id).await.unwrap();
    assert_eq!(outcome.total_likes, 1);

    let kinds: Vec<_> = state
        .social
        .notifications(bob.id)
        .await
        .unwrap()
        .into_iter()
        .map(|n| n.notification_type)
        .collect();
    assert_eq!(
        kinds,
        vec![NotificationType::Like, NotificationType::Comment, NotificationType::Follow]
    );

    state.social.unfollow(alice.id, bob.id).await.unwrap();
    assert!(state.social.feed(alice.id).await.unwrap().is_empty());

    let profile = state.social.user_profile("bob", alice.id).await.unwrap();
    assert!(!profile.is_following);
    assert_eq!(profile.posts.len(), 1);
    assert_eq!(profile.posts[0].total_comments, 1);
    assert!(profile.posts[0].liked_by_viewer);
}

#[tokio::test]
async fn test_registration_errors() {
    let (state, _dir) = setup().await;

    let form = RegisterForm {
        username: "alice".into(),
        email: "alice@example.com".into(),
        password1: "long-enough-1".into(),
        password2: "long-enough-2".into(),
    };
    let errors = state.accounts.register(&form).await.unwrap().unwrap_err();
    assert_eq!(errors.field("password2"), ["The two password fields didn't match."]);

    let form = RegisterForm { password2: "long-enough-1".into(), ..form };
    let created = state.accounts.register(&form).await.unwrap().unwrap();
    assert_eq!(created.username, "alice");

    let errors = state.accounts.register(&form).await.unwrap().unwrap_err();
    assert_eq!(errors.field("username"), ["A user with that username already exists."]);
}

#[tokio::test]
async fn test_comment_text_is_stored_as_submitted() {
    let (state, _dir) = setup().await;
    let alice = user(&state, "alice").await;
    let p = post(&state, &alice, "hi").await;

    let comment = state.social.add_comment(alice.id, p.id, "  nice!\n").await.unwrap();
    assert_eq!(comment.text, "  nice!\n");
    let stored = state.social.post_detail(p.id, alice.id).await.unwrap().comments;
    assert_eq!(stored[0].text, "  nice!\n");
}

#[tokio::test]
async fn test_blank_search_lists_everyone_else() {
    let (state, _dir) = setup().await;
    let alice = user(&state, "alice").await;
    for name in ["bob", "carol", "dave"] {
        user(&state, name).await;
    }

    for query in ["", "   "] {
        let found = state.social.search(alice.id, query).await.unwrap();
        let names: Vec<_> = found.iter().map(|u| u.username.as_str()).collect();
        assert_eq!(names, vec!["bob", "carol", "dave"]);
    }

    for i in 0..25 {
        user(&state, &format!("user{:02}", i)).await;
    }
    assert_eq!(state.social.search(alice.id, "").await.unwrap().len(), 20);
}

#[tokio::test]
async fn test_update_profile_replaces_picture_only_when_uploaded() {
    let (state, dir) = setup().await;
    let alice = user(&state, "alice").await;

    let form = ProfileForm { bio: "hello there".into(), profile_pic: Some(png("me.png")) };
    let profile = state.accounts.update_profile(alice.id, &form).await.unwrap().unwrap();
    assert_eq!(profile.bio, "hello there");
    let picture = profile.picture.clone().unwrap();
    assert!(picture.starts_with("profiles/"));
    assert!(picture.ends_with(".png"));
    assert!(dir.path().join(&picture).exists());

    let form = ProfileForm { bio: "new bio".into(), profile_pic: None };
    let profile = state.accounts.update_profile(alice.id, &form).await.unwrap().unwrap();
    assert_eq!(profile.bio, "new bio");
    assert_eq!(profile.picture.as_deref(), Some(picture.as_str()));

    let form = ProfileForm { bio: "ignored".into(), profile_pic: Some(png("notes.txt")) };
    let errors = state.accounts.update_profile(alice.id, &form).await.unwrap().unwrap_err();
    assert_eq!(errors.field("profile_pic").len(), 1);

    let overview = state.accounts.overview(alice.id).await.unwrap();
    assert_eq!(overview.profile.bio, "new bio");
    assert_eq!(overview.profile.picture.as_deref(), Some(picture.as_str()));
}

#[tokio::test]
async fn test_chat_message_with_image() {
    let (state, dir) = setup().await;
    let alice = user(&state, "alice").await;
    let bob = user(&state, "bob").await;
    let chat_id = state.chats.find_or_create_chat(alice.id, bob.id).await.unwrap();

    let form = MessageForm { text: String::new(), image: Some(png("snap.png")) };
    let message = state.chats.send_message(chat_id, alice.id, &form).await.unwrap().unwrap();
    let image = message.image.clone().unwrap();
    assert!(image.starts_with("chat_images/"));
    assert!(dir.path().join(&image).exists());
    assert_eq!(message.text, "");

    let detail = state.chats.chat_detail(chat_id, bob.id).await.unwrap();
    assert_eq!(detail.messages.len(), 1);
    assert_eq!(detail.messages[0].image.as_deref(), Some(image.as_str()));
}
