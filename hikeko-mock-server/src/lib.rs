use std::collections::HashMap;

use async_trait::async_trait;
use hikeko_client::{
    api::{
        self, Activity, AuthToken, Blog, BlogFilter, BlogId, BlogSummary, Comment, CommentId,
        Error, FetchBlogs, FetchComments, GetBlog, GetProfile, IsLikedByUser, LikeBlog,
        LikeStatus, NewBlog, NewComment, PageCount, Profile, Session, SignIn, SignUp, Time,
        UserId, UserSummary, Uuid,
    },
    Backend,
};

#[derive(Debug)]
struct DbUser {
    id: UserId,
    summary: UserSummary,
    email: String,
    // tests (of which mock-server is a part of) don't actually use bcrypt
    password: String,
    total_posts: u64,
    total_reads: u64,
    joined_at: Time,
}

#[derive(Debug)]
struct DbBlog {
    author: UserId,
    draft: bool,
    blog: Blog,
}

#[derive(Debug)]
struct Notification {
    kind: &'static str,
    blog_id: BlogId,
    for_user: UserId,
    from_user: UserId,
}

/// In-memory mirror of the server's behavior
///
/// Everything is kept in insertion order, oldest first.
#[derive(Debug, Default)]
pub struct MockServer {
    users: Vec<DbUser>,
    sessions: HashMap<AuthToken, UserId>,
    blogs: Vec<DbBlog>,
    comments: Vec<Comment>,
    likes: Vec<(UserId, BlogId)>,
    notifications: Vec<Notification>,
}

impl MockServer {
    pub fn new() -> MockServer {
        MockServer::default()
    }

    /// Return email & password for user number `id`
    pub fn test_get_user_info(&self, id: usize) -> (&str, &str) {
        let u = self
            .users
            .get(id)
            .unwrap_or_else(|| panic!("getting user {id} among {}", self.users.len()));
        (&u.email, &u.password)
    }

    /// Return the current number of users
    pub fn test_num_users(&self) -> usize {
        self.users.len()
    }

    /// Return the username of user number `id`
    pub fn test_get_username(&self, id: usize) -> &str {
        &self.users[id].summary.username
    }

    /// Return the current number of blogs, drafts included
    pub fn test_num_blogs(&self) -> usize {
        self.blogs.len()
    }

    /// Return the id and title of blog number `id`, counted from the oldest
    pub fn test_get_blog_info(&self, id: usize) -> (&BlogId, &str) {
        let b = self
            .blogs
            .get(id)
            .unwrap_or_else(|| panic!("getting blog {id} among {}", self.blogs.len()));
        (&b.blog.blog_id, &b.blog.title)
    }

    /// Return the kind and sender of each notification `username` received, oldest first
    pub fn test_notifications_for(&self, username: &str) -> Vec<(&str, &str)> {
        let u = match self.user_by_name(username) {
            None => return Vec::new(),
            Some(u) => u,
        };
        self.notifications
            .iter()
            .filter(|n| n.for_user == u.id)
            .map(|n| (n.kind, &self.user(n.from_user).summary.username as &str))
            .collect()
    }

    fn user(&self, id: UserId) -> &DbUser {
        self.users
            .iter()
            .find(|u| u.id == id)
            .expect("sessions and blogs only reference existing users")
    }

    fn user_mut(&mut self, id: UserId) -> &mut DbUser {
        self.users
            .iter_mut()
            .find(|u| u.id == id)
            .expect("sessions and blogs only reference existing users")
    }

    fn user_by_name(&self, username: &str) -> Option<&DbUser> {
        self.users.iter().find(|u| u.summary.username == username)
    }

    fn resolve(&self, tok: AuthToken) -> Result<&DbUser, Error> {
        match self.sessions.get(&tok) {
            Some(id) => Ok(self.user(*id)),
            None => Err(Error::PermissionDenied),
        }
    }

    fn open_session(&mut self, user: UserId) -> Session {
        let access_token = AuthToken(Uuid::new_v4());
        self.sessions.insert(access_token, user);
        let u = &self.user(user).summary;
        Session {
            access_token,
            username: u.username.clone(),
            fullname: u.fullname.clone(),
            profile_img: u.profile_img.clone(),
        }
    }

    pub fn signup(&mut self, s: SignUp) -> Result<Session, Error> {
        s.validate()?;
        if self.users.iter().any(|u| u.email == s.email) {
            return Err(Error::EmailAlreadyUsed(s.email));
        }
        let mut username = String::from(s.base_username());
        if self.user_by_name(&username).is_some() {
            username.push_str(&api::random_suffix(5));
        }
        let id = UserId(Uuid::new_v4());
        self.users.push(DbUser {
            id,
            summary: UserSummary {
                profile_img: UserSummary::default_profile_img(&username),
                username,
                fullname: s.fullname,
            },
            email: s.email,
            password: s.password,
            total_posts: 0,
            total_reads: 0,
            joined_at: chrono::Utc::now(),
        });
        Ok(self.open_session(id))
    }

    pub fn signin(&mut self, s: SignIn) -> Result<Session, Error> {
        s.validate()?;
        let id = match self.users.iter().find(|u| u.email == s.email) {
            Some(u) if u.password == s.password => u.id,
            _ => return Err(Error::PermissionDenied),
        };
        Ok(self.open_session(id))
    }

    pub fn signout(&mut self, tok: AuthToken) -> Result<(), Error> {
        match self.sessions.remove(&tok) {
            Some(_) => Ok(()),
            None => Err(Error::PermissionDenied),
        }
    }

    pub fn whoami(&self, tok: AuthToken) -> Result<UserSummary, Error> {
        Ok(self.resolve(tok)?.summary.clone())
    }

    pub async fn latest_blogs(&self, req: FetchBlogs) -> Result<Vec<BlogSummary>, Error> {
        flatten(api::fetch_blog_page(&mut &*self, &req).await)
    }

    pub async fn count_blogs(&self, filter: BlogFilter) -> Result<PageCount, Error> {
        flatten(api::count_blog_page(&mut &*self, &filter).await)
    }

    pub async fn get_blog_comments(&self, req: FetchComments) -> Result<Vec<Comment>, Error> {
        flatten(api::fetch_comment_page(&mut &*self, &req).await)
    }

    /// Reading a blog counts as a read for it and its author
    pub fn get_blog(&mut self, req: GetBlog) -> Result<Blog, Error> {
        req.blog_id.validate()?;
        let b = self
            .blogs
            .iter_mut()
            .find(|b| b.blog.blog_id == req.blog_id)
            .ok_or_else(|| Error::BlogNotFound(req.blog_id.0.clone()))?;
        b.blog.activity.total_reads += 1;
        let (author, blog) = (b.author, b.blog.clone());
        self.user_mut(author).total_reads += 1;
        Ok(blog)
    }

    pub fn create_blog(&mut self, tok: AuthToken, b: NewBlog) -> Result<BlogId, Error> {
        let author = self.resolve(tok)?;
        b.validate()?;
        let (author_id, author_summary) = (author.id, author.summary.clone());
        let blog_id = BlogId::from_title(&b.title, &api::random_suffix(21));
        let tags = b.normalized_tags();
        self.blogs.push(DbBlog {
            author: author_id,
            draft: b.draft,
            blog: Blog {
                blog_id: blog_id.clone(),
                title: b.title,
                des: b.des,
                banner: b.banner,
                content: b.content,
                tags,
                activity: Activity::default(),
                published_at: chrono::Utc::now(),
                author: author_summary,
            },
        });
        if !b.draft {
            self.user_mut(author_id).total_posts += 1;
        }
        Ok(blog_id)
    }

    pub fn add_comment(&mut self, tok: AuthToken, c: NewComment) -> Result<Comment, Error> {
        let commenter = self.resolve(tok)?;
        c.validate()?;
        let (commenter_id, commented_by) = (commenter.id, commenter.summary.clone());
        let b = self
            .blogs
            .iter_mut()
            .find(|b| b.blog.blog_id == c.blog_id)
            .ok_or_else(|| Error::BlogNotFound(c.blog_id.0.clone()))?;
        b.blog.activity.total_comments += 1;
        b.blog.activity.total_parent_comments += 1;
        let comment = Comment {
            id: CommentId(Uuid::new_v4()),
            blog_id: c.blog_id,
            blog_author: b.author,
            commented_by,
            comment: c.comment,
            commented_at: chrono::Utc::now(),
        };
        self.notifications.push(Notification {
            kind: "comment",
            blog_id: comment.blog_id.clone(),
            for_user: b.author,
            from_user: commenter_id,
        });
        self.comments.push(comment.clone());
        Ok(comment)
    }

    /// Liking notifies the author, unliking takes the notification back
    pub fn like_blog(&mut self, tok: AuthToken, req: LikeBlog) -> Result<LikeStatus, Error> {
        let user = self.resolve(tok)?.id;
        req.validate()?;
        let b = self
            .blogs
            .iter_mut()
            .find(|b| b.blog.blog_id == req.blog_id)
            .ok_or_else(|| Error::BlogNotFound(req.blog_id.0.clone()))?;
        let existing = self
            .likes
            .iter()
            .position(|(u, blog)| *u == user && *blog == req.blog_id);
        match (req.liked, existing) {
            (true, None) => {
                b.blog.activity.total_likes += 1;
                self.likes.push((user, req.blog_id.clone()));
                self.notifications.push(Notification {
                    kind: "like",
                    blog_id: req.blog_id.clone(),
                    for_user: b.author,
                    from_user: user,
                });
            }
            (false, Some(i)) => {
                b.blog.activity.total_likes -= 1;
                self.likes.remove(i);
                self.notifications.retain(|n| {
                    !(n.kind == "like" && n.from_user == user && n.blog_id == req.blog_id)
                });
            }
            _ => (),
        }
        Ok(LikeStatus {
            liked: req.liked,
            total_likes: b.blog.activity.total_likes,
        })
    }

    pub fn is_liked_by_user(
        &self,
        tok: AuthToken,
        req: IsLikedByUser,
    ) -> Result<LikeStatus, Error> {
        let user = self.resolve(tok)?.id;
        req.validate()?;
        let b = self
            .blogs
            .iter()
            .find(|b| b.blog.blog_id == req.blog_id)
            .ok_or_else(|| Error::BlogNotFound(req.blog_id.0.clone()))?;
        Ok(LikeStatus {
            liked: self
                .likes
                .iter()
                .any(|(u, blog)| *u == user && *blog == req.blog_id),
            total_likes: b.blog.activity.total_likes,
        })
    }

    pub async fn trending_blogs(&self) -> Result<Vec<BlogSummary>, Error> {
        flatten(api::fetch_trending(&mut &*self).await.map(Ok))
    }

    pub fn get_profile(&self, req: GetProfile) -> Result<Profile, Error> {
        api::validate_string(&req.username)?;
        let u = self
            .user_by_name(&req.username)
            .ok_or_else(|| Error::UserNotFound(req.username.clone()))?;
        Ok(Profile {
            user: u.summary.clone(),
            bio: String::new(),
            total_posts: u.total_posts,
            total_reads: u.total_reads,
            joined_at: u.joined_at,
        })
    }
}

fn flatten<T>(res: anyhow::Result<Result<T, Error>>) -> Result<T, Error> {
    res.unwrap_or_else(|e| Err(Error::Unknown(format!("{e:?}"))))
}

// stable sorts keep the reversed insertion order among equal timestamps
fn most_recent_first<T>(items: &mut [T], time: impl Fn(&T) -> Time) {
    items.sort_by(|a, b| time(b).cmp(&time(a)));
}

#[async_trait]
impl<'a> api::Store for &'a MockServer {
    async fn count_blogs(&mut self, filter: &BlogFilter) -> anyhow::Result<u64> {
        Ok(self
            .blogs
            .iter()
            .filter(|b| !b.draft && filter.matches(&b.blog.summary()))
            .count() as u64)
    }

    async fn find_blogs(
        &mut self,
        filter: &BlogFilter,
        skip: u64,
        limit: u64,
    ) -> anyhow::Result<Vec<BlogSummary>> {
        let mut blogs = self
            .blogs
            .iter()
            .rev()
            .filter(|b| !b.draft)
            .map(|b| b.blog.summary())
            .filter(|b| filter.matches(b))
            .collect::<Vec<_>>();
        most_recent_first(&mut blogs, |b| b.published_at);
        Ok(blogs
            .into_iter()
            .skip(skip as usize)
            .take(limit as usize)
            .collect())
    }

    async fn find_comments(
        &mut self,
        blog: &BlogId,
        skip: u64,
        limit: u64,
    ) -> anyhow::Result<Vec<Comment>> {
        let mut comments = self
            .comments
            .iter()
            .rev()
            .filter(|c| c.blog_id == *blog)
            .cloned()
            .collect::<Vec<_>>();
        most_recent_first(&mut comments, |c| c.commented_at);
        Ok(comments
            .into_iter()
            .skip(skip as usize)
            .take(limit as usize)
            .collect())
    }

    async fn find_trending(&mut self, limit: u64) -> anyhow::Result<Vec<BlogSummary>> {
        let mut blogs = self
            .blogs
            .iter()
            .rev()
            .filter(|b| !b.draft)
            .map(|b| b.blog.summary())
            .collect::<Vec<_>>();
        blogs.sort_by(|a, b| {
            let key = |b: &BlogSummary| {
                (
                    b.activity.total_reads,
                    b.activity.total_likes,
                    b.published_at,
                )
            };
            key(b).cmp(&key(a))
        });
        blogs.truncate(limit as usize);
        Ok(blogs)
    }
}

#[async_trait]
impl Backend for MockServer {
    async fn count_blogs(&self, filter: &BlogFilter) -> anyhow::Result<u64> {
        Ok(MockServer::count_blogs(self, filter.clone()).await?.total_docs)
    }

    async fn fetch_blogs(
        &self,
        filter: &BlogFilter,
        page: u64,
    ) -> anyhow::Result<Vec<BlogSummary>> {
        Ok(self
            .latest_blogs(FetchBlogs {
                filter: filter.clone(),
                page,
            })
            .await?)
    }

    async fn fetch_comments(&self, blog: &BlogId, skip: u64) -> anyhow::Result<Vec<Comment>> {
        Ok(self
            .get_blog_comments(FetchComments {
                blog_id: blog.clone(),
                skip,
            })
            .await?)
    }
}
