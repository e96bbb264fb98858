// Plain HTML rendering. Every dynamic value goes through `escape`.

use chrono::{DateTime, Utc};

use crate::forms::FormErrors;
use crate::media::media_url;
use crate::models::{ChatSummary, Notification, Post, PostView, User};
use crate::services::{AccountOverview, ChatDetail, PostDetail, UserProfile};
use crate::viewer::Viewer;

pub fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}

pub fn display_date(at: &DateTime<Utc>) -> String {
    at.format("%b %d, %Y").to_string()
}

/// Navigation state shared by every logged-in page.
#[derive(Debug, Clone)]
pub struct Chrome {
    pub viewer: Viewer,
    pub unread_notifications: i64,
}

fn document(title: &str, nav: &str, body: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html><head><meta charset=\"utf-8\"><title>{} | Social Feed</title></head>\n<body>\n{}<main>\n{}</main>\n</body></html>\n",
        escape(title),
        nav,
        body
    )
}

fn layout(chrome: &Chrome, title: &str, body: &str) -> String {
    let badge = if chrome.unread_notifications > 0 {
        format!(" ({})", chrome.unread_notifications)
    } else {
        String::new()
    };
    let nav = format!(
        "<nav><a href=\"/\">Feed</a> <a href=\"/create-post\">New post</a> \
         <a href=\"/search\">Search</a> <a href=\"/chats\">Chats</a> \
         <a href=\"/notifications\">Notifications{}</a> <a href=\"/profile\">{}</a> \
         <form method=\"post\" action=\"/logout\" style=\"display:inline\"><button>Log out</button></form></nav>\n",
        badge,
        escape(&chrome.viewer.username)
    );
    document(title, &nav, body)
}

fn anonymous_layout(title: &str, body: &str) -> String {
    let nav = "<nav><a href=\"/login\">Log in</a> <a href=\"/register\">Sign up</a></nav>\n";
    document(title, nav, body)
}

fn error_list(messages: &[String]) -> String {
    if messages.is_empty() {
        return String::new();
    }
    let items: String = messages
        .iter()
        .map(|m| format!("<li>{}</li>", escape(m)))
        .collect();
    format!("<ul class=\"errors\">{}</ul>", items)
}

fn input(errors: &FormErrors, label: &str, name: &str, kind: &str, value: &str) -> String {
    format!(
        "<p><label>{} <input type=\"{}\" name=\"{}\" value=\"{}\"></label>{}</p>\n",
        label,
        kind,
        name,
        escape(value),
        error_list(errors.field(name))
    )
}

fn post_card(view: &PostView) -> String {
    let post = &view.post;
    let like_label = if view.liked_by_viewer { "Unlike" } else { "Like" };
    format!(
        "<article class=\"post\" id=\"post-{id}\">\
         <header><a href=\"/user/{author}\">{author}</a> <time>{date}</time></header>\
         <a href=\"/post/{id}\"><img src=\"{image}\" alt=\"\"></a>\
         <p>{caption}</p>\
         <footer><form method=\"post\" action=\"/like-post/{id}\"><button>{like_label}</button></form> \
         <span class=\"likes\">{likes} likes</span> <a href=\"/post/{id}\">{comments} comments</a> \
         <a href=\"/share/{id}\">Share</a></footer></article>\n",
        id = post.id,
        author = escape(&post.author_username),
        date = display_date(&post.created_at),
        image = escape(&media_url(&post.image)),
        caption = escape(&post.caption),
        like_label = like_label,
        likes = view.total_likes,
        comments = view.total_comments,
    )
}

fn post_list(posts: &[PostView], empty: &str) -> String {
    if posts.is_empty() {
        return format!("<p>{}</p>\n", empty);
    }
    posts.iter().map(post_card).collect()
}

fn avatar(picture: Option<&str>) -> String {
    match picture {
        Some(path) => format!("<img class=\"avatar\" src=\"{}\" alt=\"\">", escape(&media_url(path))),
        None => String::new(),
    }
}

pub fn register_page(username: &str, email: &str, errors: &FormErrors) -> String {
    let body = format!(
        "<h1>Sign up</h1>\n<form method=\"post\" action=\"/register\">{}{}{}{}{}<button>Sign up</button></form>\n",
        error_list(errors.non_field()),
        input(errors, "Username", "username", "text", username),
        input(errors, "Email", "email", "email", email),
        input(errors, "Password", "password1", "password", ""),
        input(errors, "Password confirmation", "password2", "password", ""),
    );
    anonymous_layout("Sign up", &body)
}

pub fn login_page(username: &str, next: Option<&str>, errors: &FormErrors) -> String {
    let next_field = next
        .map(|n| format!("<input type=\"hidden\" name=\"next\" value=\"{}\">", escape(n)))
        .unwrap_or_default();
    let body = format!(
        "<h1>Log in</h1>\n<form method=\"post\" action=\"/login\">{}{}{}{}<button>Log in</button></form>\n",
        error_list(errors.non_field()),
        input(errors, "Username", "username", "text", username),
        input(errors, "Password", "password", "password", ""),
        next_field,
    );
    anonymous_layout("Log in", &body)
}

pub fn feed_page(chrome: &Chrome, posts: &[PostView]) -> String {
    let body = format!(
        "<h1>Feed</h1>\n{}",
        post_list(posts, "No posts yet. Follow someone or create a post.")
    );
    layout(chrome, "Feed", &body)
}

pub fn own_profile_page(chrome: &Chrome, account: &AccountOverview, posts: &[PostView], errors: &FormErrors) -> String {
    let body = format!(
        "<h1>{username}</h1>\n{avatar}<p>{bio}</p>\n\
         <p>{posts} posts, {followers} followers, {following} following</p>\n\
         <form method=\"post\" action=\"/profile\" enctype=\"multipart/form-data\">{non_field}\
         <p><label>Bio <textarea name=\"bio\">{bio}</textarea></label>{bio_errors}</p>\
         <p><label>Profile picture <input type=\"file\" name=\"profile_pic\" accept=\"image/*\"></label>{pic_errors}</p>\
         <button>Save</button></form>\n{list}",
        username = escape(&account.user.username),
        avatar = avatar(account.profile.picture.as_deref()),
        bio = escape(&account.profile.bio),
        posts = posts.len(),
        followers = account.counts.followers,
        following = account.counts.following,
        non_field = error_list(errors.non_field()),
        bio_errors = error_list(errors.field("bio")),
        pic_errors = error_list(errors.field("profile_pic")),
        list = post_list(posts, "You have not posted anything yet."),
    );
    layout(chrome, "Profile", &body)
}

pub fn create_post_page(chrome: &Chrome, caption: &str, errors: &FormErrors) -> String {
    let body = format!(
        "<h1>New post</h1>\n<form method=\"post\" action=\"/create-post\" enctype=\"multipart/form-data\">{}\
         <p><label>Image <input type=\"file\" name=\"image\" accept=\"image/*\"></label>{}</p>\
         <p><label>Caption <textarea name=\"caption\">{}</textarea></label></p>\
         <button>Post</button></form>\n",
        error_list(errors.non_field()),
        error_list(errors.field("image")),
        escape(caption),
    );
    layout(chrome, "New post", &body)
}

pub fn post_detail_page(chrome: &Chrome, detail: &PostDetail) -> String {
    let comments: String = detail
        .comments
        .iter()
        .map(|c| {
            format!(
                "<li><a href=\"/user/{author}\">{author}</a> {text} <time>{date}</time></li>",
                author = escape(&c.author_username),
                text = escape(&c.text),
                date = display_date(&c.created_at),
            )
        })
        .collect();
    let body = format!(
        "{}<h2>Comments</h2>\n<ul class=\"comments\">{}</ul>\n\
         <form method=\"post\" action=\"/post/{}\"><textarea name=\"comment\"></textarea><button>Comment</button></form>\n",
        post_card(&detail.post),
        comments,
        detail.post.post.id,
    );
    layout(chrome, "Post", &body)
}

pub fn user_profile_page(chrome: &Chrome, profile: &UserProfile) -> String {
    let username = escape(&profile.user.username);
    let action = if profile.user.id == chrome.viewer.user_id {
        String::new()
    } else {
        let (path, label) = if profile.is_following {
            ("unfollow", "Unfollow")
        } else {
            ("follow", "Follow")
        };
        format!(
            "<form method=\"post\" action=\"/{path}/{u}\"><button>{label}</button></form> <a href=\"/chat/start/{u}\">Message</a>\n",
            path = path,
            u = username,
            label = label,
        )
    };
    let body = format!(
        "<h1>{username}</h1>\n<p>{full_name}</p>{avatar}<p>{bio}</p>\n\
         <p>{posts} posts, {followers} followers, {following} following</p>\n{action}{list}",
        username = username,
        full_name = escape(&profile.user.full_name()),
        avatar = avatar(profile.profile.picture.as_deref()),
        bio = escape(&profile.profile.bio),
        posts = profile.posts.len(),
        followers = profile.counts.followers,
        following = profile.counts.following,
        action = action,
        list = post_list(&profile.posts, "No posts yet."),
    );
    layout(chrome, &profile.user.username, &body)
}

fn user_list(users: &[User], empty: &str) -> String {
    if users.is_empty() {
        return format!("<p>{}</p>\n", empty);
    }
    let items: String = users
        .iter()
        .map(|u| {
            format!(
                "<li><a href=\"/user/{u}\">{u}</a> {name}</li>",
                u = escape(&u.username),
                name = escape(&u.full_name()),
            )
        })
        .collect();
    format!("<ul class=\"users\">{}</ul>\n", items)
}

pub fn search_page(chrome: &Chrome, query: &str, users: &[User]) -> String {
    let results = user_list(users, "No users found.");
    let body = format!(
        "<h1>Search</h1>\n<form method=\"get\" action=\"/search\"><input type=\"search\" name=\"q\" value=\"{}\"><button>Search</button></form>\n{}",
        escape(query),
        results,
    );
    layout(chrome, "Search", &body)
}

pub fn chat_list_page(chrome: &Chrome, chats: &[ChatSummary]) -> String {
    let list = if chats.is_empty() {
        "<p>No conversations yet.</p>\n".to_string()
    } else {
        let items: String = chats
            .iter()
            .map(|c| {
                format!(
                    "<li><a href=\"/chat/{id}\">{other}</a> <span>{preview}</span> <time>{date}</time></li>",
                    id = c.chat.id,
                    other = escape(c.other_username.as_deref().unwrap_or("(just you)")),
                    preview = escape(c.last_message.as_deref().unwrap_or("")),
                    date = display_date(&c.chat.updated_at),
                )
            })
            .collect();
        format!("<ul class=\"chats\">{}</ul>\n", items)
    };
    layout(chrome, "Chats", &format!("<h1>Chats</h1>\n{}", list))
}

pub fn chat_page(chrome: &Chrome, detail: &ChatDetail, errors: &FormErrors) -> String {
    let title = detail
        .other_user
        .as_ref()
        .map(|u| u.username.clone())
        .unwrap_or_else(|| "Chat".to_string());
    let messages: String = detail
        .messages
        .iter()
        .map(|m| {
            let image = m
                .image
                .as_deref()
                .map(|path| format!("<img src=\"{}\" alt=\"\">", escape(&media_url(path))))
                .unwrap_or_default();
            format!(
                "<li class=\"{class}\"><strong>{sender}</strong> {text}{image} <time>{date}</time></li>",
                class = if m.sender_id == chrome.viewer.user_id { "mine" } else { "theirs" },
                sender = escape(&m.sender_username),
                text = escape(&m.text),
                image = image,
                date = display_date(&m.created_at),
            )
        })
        .collect();
    let body = format!(
        "<h1>{}</h1>\n<ul class=\"messages\">{}</ul>\n\
         <form method=\"post\" action=\"/chat/{}\" enctype=\"multipart/form-data\">{}\
         <input type=\"text\" name=\"text\"><input type=\"file\" name=\"image\" accept=\"image/*\">{}\
         <button>Send</button></form>\n",
        escape(&title),
        messages,
        detail.chat.id,
        error_list(errors.non_field()),
        error_list(errors.field("image")),
    );
    layout(chrome, &title, &body)
}

pub fn share_page(chrome: &Chrome, post: &Post, candidates: &[User]) -> String {
    let options: String = candidates
        .iter()
        .map(|u| format!("<option value=\"{}\">{}</option>", u.id, escape(&u.username)))
        .collect();
    let body = format!(
        "<h1>Share post</h1>\n<p><img src=\"{}\" alt=\"\"> {}</p>\n\
         <form method=\"post\" action=\"/share/{}\"><select name=\"user_id\">{}</select><button>Send</button></form>\n",
        escape(&media_url(&post.image)),
        escape(&post.caption),
        post.id,
        options,
    );
    layout(chrome, "Share post", &body)
}

pub fn notifications_page(chrome: &Chrome, notifications: &[Notification]) -> String {
    let list = if notifications.is_empty() {
        "<p>No notifications.</p>\n".to_string()
    } else {
        let items: String = notifications
            .iter()
            .map(|n| {
                let target = n
                    .post_id
                    .map(|id| format!(" <a href=\"/post/{}\">view</a>", id))
                    .unwrap_or_default();
                format!(
                    "<li class=\"{class}\"><a href=\"/user/{from}\">{from}</a> {verb}{target} <time>{date}</time></li>",
                    class = if n.is_read { "read" } else { "unread" },
                    from = escape(&n.from_username),
                    verb = n.notification_type.verb(),
                    target = target,
                    date = display_date(&n.created_at),
                )
            })
            .collect();
        format!("<ul class=\"notifications\">{}</ul>\n", items)
    };
    layout(chrome, "Notifications", &format!("<h1>Notifications</h1>\n{}", list))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape() {
        assert_eq!(escape("<b>\"Tom\" & 'Jerry'</b>"), "&lt;b&gt;&quot;Tom&quot; &amp; &#x27;Jerry&#x27;&lt;/b&gt;");
    }

    #[test]
    fn test_login_page_escapes_input() {
        let html = login_page("<script>", Some("/chats"), &FormErrors::default());
        assert!(html.contains("&lt;script&gt;"));
        assert!(!html.contains("<script>"));
        assert!(html.contains("name=\"next\" value=\"/chats\""));
    }

    #[test]
    fn test_register_page_shows_field_errors() {
        let mut errors = FormErrors::default();
        errors.add("password2", "The two password fields didn't match.");
        let html = register_page("alice", "a@example.com", &errors);
        assert!(html.contains("didn&#x27;t match"));
    }
}
