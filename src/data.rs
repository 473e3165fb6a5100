use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::client::{
    Client, Comment, Error, FollowLists, Listing, NewPost, Post, PostPatch, Profile, ProfilePatch,
    Reaction, Result,
};

pub trait FeedService: Send + Sync {
    fn list(&self, limit: u32, page: u32, tag: Option<&str>) -> Result<Listing<Post>>;
    fn list_by_user(
        &self,
        username: &str,
        limit: u32,
        page: u32,
        tag: Option<&str>,
    ) -> Result<Listing<Post>>;
    fn search(&self, query: &str) -> Result<Listing<Post>>;
}

pub trait PostService: Send + Sync {
    fn get(&self, id: i64) -> Result<Post>;
    fn create(&self, post: &NewPost) -> Result<Post>;
    fn update(&self, id: i64, patch: &PostPatch) -> Result<Post>;
    fn delete(&self, id: i64) -> Result<()>;
}

pub trait ReactionService: Send + Sync {
    fn toggle(&self, post_id: i64, symbol: &str) -> Result<Vec<Reaction>>;
}

pub trait CommentService: Send + Sync {
    fn list(&self, post_id: i64) -> Result<Vec<Comment>>;
    fn add(&self, post_id: i64, body: &str) -> Result<Comment>;
    fn remove(&self, post_id: i64, comment_id: i64) -> Result<()>;
}

pub trait ProfileService: Send + Sync {
    fn fetch(&self, username: &str) -> Result<Profile>;
    fn update(&self, username: &str, patch: &ProfilePatch) -> Result<Profile>;
    fn set_following(&self, username: &str, follow: bool) -> Result<FollowLists>;
}

pub struct ApiFeedService {
    client: Arc<Client>,
}

impl ApiFeedService {
    pub fn new(client: Arc<Client>) -> Self {
        Self { client }
    }
}

impl FeedService for ApiFeedService {
    fn list(&self, limit: u32, page: u32, tag: Option<&str>) -> Result<Listing<Post>> {
        self.client.list_posts(limit, page, tag)
    }

    fn list_by_user(
        &self,
        username: &str,
        limit: u32,
        page: u32,
        tag: Option<&str>,
    ) -> Result<Listing<Post>> {
        self.client.list_posts_by_user(username, limit, page, tag)
    }

    fn search(&self, query: &str) -> Result<Listing<Post>> {
        self.client.search_posts(query)
    }
}

pub struct ApiPostService {
    client: Arc<Client>,
}

impl ApiPostService {
    pub fn new(client: Arc<Client>) -> Self {
        Self { client }
    }
}

impl PostService for ApiPostService {
    fn get(&self, id: i64) -> Result<Post> {
        self.client.get_post(id)
    }

    fn create(&self, post: &NewPost) -> Result<Post> {
        self.client.create_post(post)
    }

    fn update(&self, id: i64, patch: &PostPatch) -> Result<Post> {
        self.client.update_post(id, patch)
    }

    fn delete(&self, id: i64) -> Result<()> {
        self.client.delete_post(id)
    }
}

pub struct ApiReactionService {
    client: Arc<Client>,
}

impl ApiReactionService {
    pub fn new(client: Arc<Client>) -> Self {
        Self { client }
    }
}

impl ReactionService for ApiReactionService {
    fn toggle(&self, post_id: i64, symbol: &str) -> Result<Vec<Reaction>> {
        self.client.toggle_reaction(post_id, symbol)
    }
}

pub struct ApiCommentService {
    client: Arc<Client>,
}

impl ApiCommentService {
    pub fn new(client: Arc<Client>) -> Self {
        Self { client }
    }
}

impl CommentService for ApiCommentService {
    /// Server order is unspecified; sort by creation time ascending here
    /// so every display layer sees the same order.
    fn list(&self, post_id: i64) -> Result<Vec<Comment>> {
        let mut comments = self.client.list_comments(post_id)?;
        comments.sort_by_key(|comment| comment.created);
        Ok(comments)
    }

    fn add(&self, post_id: i64, body: &str) -> Result<Comment> {
        self.client.add_comment(post_id, body)
    }

    fn remove(&self, post_id: i64, comment_id: i64) -> Result<()> {
        self.client.delete_comment(post_id, comment_id)
    }
}

pub struct ApiProfileService {
    client: Arc<Client>,
}

impl ApiProfileService {
    pub fn new(client: Arc<Client>) -> Self {
        Self { client }
    }
}

impl ProfileService for ApiProfileService {
    fn fetch(&self, username: &str) -> Result<Profile> {
        self.client.get_profile(username)
    }

    fn update(&self, username: &str, patch: &ProfilePatch) -> Result<Profile> {
        self.client.update_profile(username, patch)
    }

    fn set_following(&self, username: &str, follow: bool) -> Result<FollowLists> {
        if follow {
            self.client.follow(username)
        } else {
            self.client.unfollow(username)
        }
    }
}

// -- mocks -----------------------------------------------------------------

/// Builds a minimal post for mock feeds and tests.
pub fn mock_post(id: i64, title: &str, author: &str) -> Post {
    Post {
        id,
        title: title.to_string(),
        author: Some(crate::client::ProfileSummary {
            name: author.to_string(),
            ..Default::default()
        }),
        ..Post::default()
    }
}

pub fn mock_listing(posts: Vec<Post>) -> Listing<Post> {
    Listing {
        data: posts,
        ..Listing::default()
    }
}

/// Scripted feed: pages and search results are served front-to-back, and
/// every call is recorded so tests can assert on request shape and count.
#[derive(Default)]
pub struct MockFeedService {
    pub pages: Mutex<VecDeque<Listing<Post>>>,
    pub search_results: Mutex<VecDeque<Listing<Post>>>,
    pub list_calls: Mutex<Vec<(u32, u32, Option<String>)>>,
    pub user_calls: Mutex<Vec<(String, u32, u32, Option<String>)>>,
    pub search_calls: Mutex<Vec<String>>,
    pub fail_next: Mutex<Option<Error>>,
}

impl MockFeedService {
    pub fn push_page(&self, posts: Vec<Post>) {
        self.pages.lock().push_back(mock_listing(posts));
    }

    pub fn push_search_result(&self, posts: Vec<Post>) {
        self.search_results.lock().push_back(mock_listing(posts));
    }

    fn take_failure(&self) -> Option<Error> {
        self.fail_next.lock().take()
    }
}

impl FeedService for MockFeedService {
    fn list(&self, limit: u32, page: u32, tag: Option<&str>) -> Result<Listing<Post>> {
        self.list_calls
            .lock()
            .push((limit, page, tag.map(str::to_string)));
        if let Some(err) = self.take_failure() {
            return Err(err);
        }
        Ok(self.pages.lock().pop_front().unwrap_or_default())
    }

    fn list_by_user(
        &self,
        username: &str,
        limit: u32,
        page: u32,
        tag: Option<&str>,
    ) -> Result<Listing<Post>> {
        self.user_calls.lock().push((
            username.to_string(),
            limit,
            page,
            tag.map(str::to_string),
        ));
        if let Some(err) = self.take_failure() {
            return Err(err);
        }
        Ok(self.pages.lock().pop_front().unwrap_or_default())
    }

    fn search(&self, query: &str) -> Result<Listing<Post>> {
        self.search_calls.lock().push(query.to_string());
        if let Some(err) = self.take_failure() {
            return Err(err);
        }
        Ok(self.search_results.lock().pop_front().unwrap_or_default())
    }
}

/// Simulates server-side reaction membership: each toggle flips whether
/// the configured viewer appears in the reactor set and returns the full
/// updated reaction list, like the real API.
pub struct MockReactionService {
    viewer: String,
    pub reactors: Mutex<HashMap<(i64, String), Vec<String>>>,
    pub toggle_calls: Mutex<Vec<(i64, String)>>,
}

impl MockReactionService {
    pub fn new(viewer: &str) -> Self {
        Self {
            viewer: viewer.to_string(),
            reactors: Mutex::new(HashMap::new()),
            toggle_calls: Mutex::new(Vec::new()),
        }
    }
}

impl ReactionService for MockReactionService {
    fn toggle(&self, post_id: i64, symbol: &str) -> Result<Vec<Reaction>> {
        self.toggle_calls
            .lock()
            .push((post_id, symbol.to_string()));
        let mut reactors = self.reactors.lock();
        let entry = reactors
            .entry((post_id, symbol.to_string()))
            .or_default();
        if let Some(index) = entry.iter().position(|name| name == &self.viewer) {
            entry.remove(index);
        } else {
            entry.push(self.viewer.clone());
        }
        let reactions = reactors
            .iter()
            .filter(|((id, _), names)| *id == post_id && !names.is_empty())
            .map(|((_, symbol), names)| Reaction {
                symbol: symbol.clone(),
                count: names.len() as i64,
                reactors: names.clone(),
            })
            .collect();
        Ok(reactions)
    }
}

#[derive(Default)]
pub struct MockCommentService {
    pub comments: Mutex<HashMap<i64, Vec<Comment>>>,
    pub add_calls: Mutex<Vec<(i64, String)>>,
    pub delete_calls: Mutex<Vec<(i64, i64)>>,
    next_id: Mutex<i64>,
}

impl CommentService for MockCommentService {
    fn list(&self, post_id: i64) -> Result<Vec<Comment>> {
        let mut comments = self
            .comments
            .lock()
            .get(&post_id)
            .cloned()
            .unwrap_or_default();
        comments.sort_by_key(|comment| comment.created);
        Ok(comments)
    }

    fn add(&self, post_id: i64, body: &str) -> Result<Comment> {
        self.add_calls.lock().push((post_id, body.to_string()));
        let mut next_id = self.next_id.lock();
        *next_id += 1;
        let comment = Comment {
            id: *next_id,
            post_id,
            body: body.to_string(),
            ..Comment::default()
        };
        self.comments
            .lock()
            .entry(post_id)
            .or_default()
            .push(comment.clone());
        Ok(comment)
    }

    fn remove(&self, post_id: i64, comment_id: i64) -> Result<()> {
        self.delete_calls.lock().push((post_id, comment_id));
        if let Some(list) = self.comments.lock().get_mut(&post_id) {
            list.retain(|comment| comment.id != comment_id);
        }
        Ok(())
    }
}
