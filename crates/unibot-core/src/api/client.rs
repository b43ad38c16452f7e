//! Typed client for the UNIBOT REST API.
//!
//! `UnibotClient` wraps a `SessionClient` and exposes one method per backend
//! operation. Authenticated calls go through `SessionClient::request`, so
//! they share its bearer-token injection and refresh-on-401 behaviour.

use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};

use crate::auth::{CredentialPair, CredentialStore, FileStore, SessionClient};
use crate::config::ClientConfig;
use crate::models::{
    ApiInfo, Assignment, ChatHistoryItem, ChatMessage, ChatReply, Course, Enrollment, Feedback,
    Listing, LoginResponse, NewAssignment, NewFeedback, ProfileUpdate, Registration,
    SyllabusUpdate, User,
};

use super::transport::{ApiRequest, ApiResponse, HttpTransport, Transport};
use super::{ApiError, ApiResult};

#[derive(Debug, serde::Serialize)]
struct LoginRequest<'a> {
    username: &'a str,
    password: &'a str,
}

pub struct UnibotClient<T = HttpTransport, S = FileStore> {
    session: SessionClient<T, S>,
}

impl<S: CredentialStore> UnibotClient<HttpTransport, S> {
    pub fn from_config(config: &ClientConfig, store: S) -> ApiResult<Self> {
        Ok(Self::new(SessionClient::from_config(config, store)?))
    }
}

impl<T: Transport, S: CredentialStore> UnibotClient<T, S> {
    pub fn new(session: SessionClient<T, S>) -> Self {
        Self { session }
    }

    pub fn session(&self) -> &SessionClient<T, S> {
        &self.session
    }

    /// Authenticated call; 2xx bodies are parsed, anything else becomes an error.
    async fn call<R: DeserializeOwned>(&self, request: ApiRequest) -> ApiResult<R> {
        let response = self.session.request(&request).await?;
        Self::check_response(&request, response)?.json()
    }

    async fn list<R: DeserializeOwned>(&self, request: ApiRequest) -> ApiResult<Vec<R>> {
        let listing: Listing<R> = self.call(request).await?;
        Ok(listing.into_vec())
    }

    fn check_response(request: &ApiRequest, response: ApiResponse) -> ApiResult<ApiResponse> {
        if !response.is_success() {
            debug!(
                method = %request.method,
                endpoint = %request.endpoint,
                status = response.status().as_u16(),
                "Request failed"
            );
        }
        response.error_for_status()
    }

    // ===== Auth =====

    /// Log in and persist the returned token pair.
    pub async fn login(&self, username: &str, password: &str) -> ApiResult<LoginResponse> {
        let request = ApiRequest::post("/auth/login/").json(&LoginRequest { username, password })?;
        let response = self.session.request_public(&request).await?;

        if !response.is_success() {
            warn!(status = response.status().as_u16(), "Login rejected");
            return Err(ApiError::InvalidCredentials);
        }

        let login: LoginResponse = response.json()?;
        if login.access.is_empty() || login.refresh.is_empty() {
            return Err(ApiError::InvalidResponse(
                "Login response is missing tokens".to_string(),
            ));
        }

        self.session
            .store_credentials(&CredentialPair::new(&login.access, &login.refresh))?;
        info!(username, "Login successful");
        Ok(login)
    }

    /// Create an account. Server-side validation errors come back verbatim
    /// as `ApiError::Validation`.
    pub async fn register(&self, registration: &Registration) -> ApiResult<User> {
        let request = ApiRequest::post("/auth/register/").json(registration)?;
        let response = self.session.request_public(&request).await?;
        Self::check_response(&request, response)?.json()
    }

    /// Forget the stored tokens. Nothing is sent to the server.
    pub fn logout(&self) -> ApiResult<()> {
        self.session.clear_credentials()?;
        info!("Logged out");
        Ok(())
    }

    pub fn is_authenticated(&self) -> ApiResult<bool> {
        Ok(self.session.load_credentials()?.is_some())
    }

    pub async fn profile(&self) -> ApiResult<User> {
        self.call(ApiRequest::get("/auth/profile/")).await
    }

    pub async fn update_profile(&self, update: &ProfileUpdate) -> ApiResult<User> {
        self.call(ApiRequest::patch("/auth/profile/").json(update)?)
            .await
    }

    /// The signed-in user, or `None` when there are no credentials or the
    /// profile cannot be fetched.
    pub async fn current_user(&self) -> ApiResult<Option<User>> {
        if !self.is_authenticated()? {
            return Ok(None);
        }
        match self.profile().await {
            Ok(user) => Ok(Some(user)),
            Err(ApiError::Store(msg)) => Err(ApiError::Store(msg)),
            Err(e) => {
                debug!(error = %e, "No current user");
                Ok(None)
            }
        }
    }

    pub async fn api_info(&self) -> ApiResult<ApiInfo> {
        let request = ApiRequest::get("/");
        let response = self.session.request_public(&request).await?;
        Self::check_response(&request, response)?.json()
    }

    // ===== Chat =====

    pub async fn send_message(&self, message: &str) -> ApiResult<ChatReply> {
        let body = ChatMessage {
            message: message.to_string(),
        };
        self.call(ApiRequest::post("/chat/").json(&body)?).await
    }

    pub async fn chat_history(&self) -> ApiResult<Vec<ChatHistoryItem>> {
        self.list(ApiRequest::get("/chat/history/")).await
    }

    // ===== Courses =====

    /// Courses visible to the current user: enrolled for students, taught
    /// for faculty, everything for admins.
    pub async fn courses(&self) -> ApiResult<Vec<Course>> {
        self.list(ApiRequest::get("/courses/")).await
    }

    pub async fn course(&self, id: i64) -> ApiResult<Course> {
        self.call(ApiRequest::get(format!("/courses/{}/", id))).await
    }

    pub async fn enrollments(&self) -> ApiResult<Vec<Enrollment>> {
        self.list(ApiRequest::get("/courses/enrollments/")).await
    }

    pub async fn update_syllabus(&self, course_id: i64, syllabus: &str) -> ApiResult<Course> {
        let body = SyllabusUpdate {
            course_id,
            syllabus: syllabus.to_string(),
        };
        self.call(ApiRequest::post("/courses/faculty/update-syllabus/").json(&body)?)
            .await
    }

    pub async fn assignments(&self) -> ApiResult<Vec<Assignment>> {
        self.list(ApiRequest::get("/courses/faculty/assignments/"))
            .await
    }

    pub async fn create_assignment(&self, assignment: &NewAssignment) -> ApiResult<Assignment> {
        self.call(ApiRequest::post("/courses/faculty/assignments/").json(assignment)?)
            .await
    }

    // ===== Feedback =====

    pub async fn submit_feedback(&self, comment: &str, rating: u8) -> ApiResult<Feedback> {
        let body = NewFeedback {
            comment: comment.to_string(),
            rating,
        };
        self.call(ApiRequest::post("/courses/feedback/").json(&body)?)
            .await
    }

    pub async fn my_feedback(&self) -> ApiResult<Vec<Feedback>> {
        self.list(ApiRequest::get("/courses/feedback/")).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::MemoryStore;
    use crate::models::Role;
    use crate::testing::{reply, MockTransport};
    use reqwest::Method;

    const BASE: &str = "http://unibot.test/api";

    const PROFILE: &str = r#"{"id": 7, "username": "student1", "email": "s1@uni.edu", "first_name": "Asha", "last_name": "Rao", "role": "student", "phone": null, "department": "CSE", "avatar_url": null}"#;

    fn client(transport: MockTransport) -> UnibotClient<MockTransport, MemoryStore> {
        UnibotClient::new(SessionClient::new(
            transport,
            MemoryStore::new(),
            &ClientConfig::new(BASE),
        ))
    }

    fn logged_in(transport: MockTransport) -> UnibotClient<MockTransport, MemoryStore> {
        let client = client(transport);
        client
            .session()
            .store_credentials(&CredentialPair::new("A", "R"))
            .unwrap();
        client
    }

    #[tokio::test]
    async fn test_login_then_profile() {
        let client = client(MockTransport::scripted(vec![
            reply(200, r#"{"access": "acc-1", "refresh": "ref-1"}"#),
            reply(200, PROFILE),
        ]));

        let login = client.login("student1", "student123").await.unwrap();
        assert_eq!(login.access, "acc-1");
        assert!(client.is_authenticated().unwrap());
        assert_eq!(
            client.session().load_credentials().unwrap(),
            Some(CredentialPair::new("acc-1", "ref-1"))
        );

        let user = client.profile().await.unwrap();
        assert_eq!(user.username, "student1");
        assert_eq!(user.role, Role::Student);

        let calls = client.session().transport().calls();
        assert_eq!(calls[0].url, "http://unibot.test/api/auth/login/");
        assert_eq!(
            calls[0].body,
            Some(serde_json::json!({ "username": "student1", "password": "student123" }))
        );
        assert_eq!(calls[0].authorization(), None);
        assert_eq!(calls[1].url, "http://unibot.test/api/auth/profile/");
        assert_eq!(calls[1].authorization(), Some("Bearer acc-1"));
    }

    #[tokio::test]
    async fn test_login_rejected_is_invalid_credentials() {
        let client = client(MockTransport::scripted(vec![reply(
            401,
            r#"{"detail": "No active account found with the given credentials"}"#,
        )]));

        let result = client.login("student1", "wrong").await;

        assert!(matches!(result, Err(ApiError::InvalidCredentials)));
        assert!(!client.is_authenticated().unwrap());
    }

    #[tokio::test]
    async fn test_login_without_tokens_is_invalid_response() {
        let client = client(MockTransport::scripted(vec![reply(
            200,
            r#"{"access": "", "refresh": "r"}"#,
        )]));

        let result = client.login("student1", "student123").await;

        assert!(matches!(result, Err(ApiError::InvalidResponse(_))));
        assert!(!client.is_authenticated().unwrap());
    }

    #[tokio::test]
    async fn test_register_surfaces_validation_detail() {
        let client = client(MockTransport::scripted(vec![reply(
            400,
            r#"{"password": ["Passwords do not match."]}"#,
        )]));
        let form = Registration {
            username: "new".into(),
            email: "new@uni.edu".into(),
            password: "a".into(),
            password_confirm: "b".into(),
            first_name: "New".into(),
            last_name: "Student".into(),
            role: Role::Student,
            department: Some("CSE".into()),
        };

        match client.register(&form).await {
            Err(ApiError::Validation { status, detail }) => {
                assert_eq!(status, 400);
                assert_eq!(detail["password"][0], "Passwords do not match.");
            }
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_register_returns_created_user() {
        let client = client(MockTransport::scripted(vec![reply(201, PROFILE)]));
        let form = Registration {
            username: "student1".into(),
            email: "s1@uni.edu".into(),
            password: "pw".into(),
            password_confirm: "pw".into(),
            first_name: "Asha".into(),
            last_name: "Rao".into(),
            role: Role::Student,
            department: None,
        };

        let user = client.register(&form).await.unwrap();
        assert_eq!(user.id, 7);
        assert!(!client.is_authenticated().unwrap());
    }

    #[tokio::test]
    async fn test_profile_refreshes_expired_token() {
        let client = logged_in(MockTransport::scripted(vec![
            reply(401, r#"{"detail": "Token is invalid or expired"}"#),
            reply(200, r#"{"access": "A2"}"#),
            reply(200, PROFILE),
        ]));

        let user = client.profile().await.unwrap();

        assert_eq!(user.username, "student1");
        assert_eq!(
            client.session().load_credentials().unwrap(),
            Some(CredentialPair::new("A2", "R"))
        );
    }

    #[tokio::test]
    async fn test_failed_refresh_surfaces_unauthorized() {
        let client = logged_in(MockTransport::scripted(vec![
            reply(401, "{}"),
            reply(401, r#"{"detail": "Token is blacklisted"}"#),
        ]));

        let result = client.courses().await;

        assert!(matches!(result, Err(ApiError::Unauthorized)));
        assert!(!client.is_authenticated().unwrap());
    }

    #[tokio::test]
    async fn test_current_user() {
        let client = client(MockTransport::scripted(vec![reply(500, "boom")]));
        assert_eq!(client.current_user().await.unwrap(), None);
        assert!(client.session().transport().calls().is_empty());

        client
            .session()
            .store_credentials(&CredentialPair::new("A", "R"))
            .unwrap();
        assert_eq!(client.current_user().await.unwrap(), None);

        let client = logged_in(MockTransport::scripted(vec![reply(200, PROFILE)]));
        let user = client.current_user().await.unwrap().unwrap();
        assert_eq!(user.display_name(), "Asha Rao");
    }

    #[tokio::test]
    async fn test_logout_clears_tokens() {
        let client = logged_in(MockTransport::scripted(vec![]));
        client.logout().unwrap();
        client.logout().unwrap();
        assert!(!client.is_authenticated().unwrap());
        assert!(client.session().transport().calls().is_empty());
    }

    #[tokio::test]
    async fn test_list_endpoints_accept_paginated_bodies() {
        let client = logged_in(MockTransport::scripted(vec![
            reply(
                200,
                r#"{"count": 1, "next": null, "previous": null, "results": [
                    {"id": 1, "name": "Data Structures", "code": "CS201", "faculty": 2, "faculty_name": "Dr. Mehta", "created_at": null, "updated_at": null}
                ]}"#,
            ),
            reply(200, "[]"),
        ]));

        let courses = client.courses().await.unwrap();
        assert_eq!(courses.len(), 1);
        assert_eq!(courses[0].code, "CS201");

        assert!(client.chat_history().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_passthrough_endpoints_and_bodies() {
        let client = logged_in(MockTransport::scripted(vec![
            reply(200, r#"{"query_id": 5, "message": "hi", "response": "Hello!", "timestamp": "2024-07-01T10:00:00Z"}"#),
            reply(200, r#"{"id": 3, "name": "DS", "code": "CS201", "faculty": 2, "faculty_name": null, "created_at": null, "updated_at": null}"#),
            reply(200, r#"{"id": 3, "name": "DS", "code": "CS201", "syllabus": "Week 1", "faculty": 2, "faculty_name": null, "created_at": null, "updated_at": null}"#),
            reply(201, r#"{"id": 9, "course": 3, "course_name": "DS", "faculty": 2, "title": "HW1", "content": "Ch 1", "due_date": null, "created_at": null, "updated_at": null}"#),
            reply(201, r#"{"id": 4, "user": 7, "comment": "Helpful", "rating": 5, "created_at": null}"#),
        ]));

        let chat = client.send_message("hi").await.unwrap();
        assert_eq!(chat.response, "Hello!");

        assert_eq!(client.course(3).await.unwrap().code, "CS201");

        let course = client.update_syllabus(3, "Week 1").await.unwrap();
        assert_eq!(course.syllabus, "Week 1");

        let assignment = client
            .create_assignment(&NewAssignment {
                course: 3,
                title: "HW1".into(),
                content: "Ch 1".into(),
                due_date: None,
            })
            .await
            .unwrap();
        assert_eq!(assignment.id, 9);

        let feedback = client.submit_feedback("Helpful", 5).await.unwrap();
        assert_eq!(feedback.rating, 5);

        let calls = client.session().transport().calls();
        let summary: Vec<(Method, &str)> = calls
            .iter()
            .map(|c| (c.method.clone(), c.url.trim_start_matches(BASE)))
            .collect();
        assert_eq!(
            summary,
            vec![
                (Method::POST, "/chat/"),
                (Method::GET, "/courses/3/"),
                (Method::POST, "/courses/faculty/update-syllabus/"),
                (Method::POST, "/courses/faculty/assignments/"),
                (Method::POST, "/courses/feedback/"),
            ]
        );
        assert_eq!(calls[0].body, Some(serde_json::json!({ "message": "hi" })));
        assert_eq!(
            calls[2].body,
            Some(serde_json::json!({ "course_id": 3, "syllabus": "Week 1" }))
        );
        assert_eq!(
            calls[4].body,
            Some(serde_json::json!({ "comment": "Helpful", "rating": 5 }))
        );
        assert!(calls.iter().all(|c| c.authorization() == Some("Bearer A")));
    }

    #[tokio::test]
    async fn test_update_profile_and_feedback_listing() {
        let client = logged_in(MockTransport::scripted(vec![
            reply(200, PROFILE),
            reply(200, r#"[{"id": 1, "user": 7, "comment": "Fast answers", "rating": 4, "created_at": "2024-07-02T08:00:00Z"}]"#),
        ]));
        let update = ProfileUpdate {
            phone: Some("9876543210".into()),
            ..ProfileUpdate::default()
        };

        client.update_profile(&update).await.unwrap();
        let feedback = client.my_feedback().await.unwrap();
        assert_eq!(feedback[0].comment, "Fast answers");

        let calls = client.session().transport().calls();
        assert_eq!(calls[0].method, Method::PATCH);
        assert_eq!(calls[0].url, "http://unibot.test/api/auth/profile/");
        assert_eq!(calls[0].body, Some(serde_json::json!({ "phone": "9876543210" })));
        assert_eq!(calls[1].method, Method::GET);
        assert_eq!(calls[1].url, "http://unibot.test/api/courses/feedback/");
    }

    #[tokio::test]
    async fn test_forbidden_is_access_denied() {
        let client = logged_in(MockTransport::scripted(vec![reply(
            403,
            r#"{"detail": "You do not have permission to perform this action."}"#,
        )]));

        let result = client.assignments().await;
        assert!(matches!(result, Err(ApiError::AccessDenied(_))));
        assert!(client.is_authenticated().unwrap());
    }

    #[tokio::test]
    async fn test_api_info_is_unauthenticated() {
        let client = logged_in(MockTransport::scripted(vec![reply(
            200,
            r#"{"name": "UNIBOT API", "version": "1.0.0", "description": "Smart university chatbot API", "endpoints": {"auth": "/api/auth/"}}"#,
        )]));

        let info = client.api_info().await.unwrap();
        assert_eq!(info.name, "UNIBOT API");
        let calls = client.session().transport().calls();
        assert_eq!(calls[0].url, "http://unibot.test/api/");
        assert_eq!(calls[0].authorization(), None);
    }
}
