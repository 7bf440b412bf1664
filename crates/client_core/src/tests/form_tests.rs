use super::*;
use crate::{
    resource::Operation,
    test_support::{transport_failure, FakeApi},
};
use shared::{domain::Person, error::FieldErrors};

fn person_form() -> (Arc<FakeApi<Person>>, FormController<Person>) {
    let api = Arc::new(FakeApi::<Person>::new());
    let form = FormController::new(api.clone() as Arc<dyn CrudApi<Person>>);
    (api, form)
}

fn rejected_email() -> ClientError {
    let mut fields = FieldErrors::new();
    fields.insert("email".to_string(), vec!["Enter a valid email address.".to_string()]);
    ClientError::Validation {
        resource: "people",
        status: 400,
        message: "invalid fields: email".to_string(),
        fields,
    }
}

#[tokio::test]
async fn without_id_starts_in_create_mode_with_default_entity() {
    let (api, mut form) = person_form();
    assert_eq!(form.state(), FormState::Uninitialized);

    form.init(None).await.expect("init");
    assert_eq!(form.state(), FormState::CreateReady);
    assert_eq!(form.mode(), FormMode::Create);
    assert_eq!(form.entity(), &Person::default());
    assert!(api.call_log().await.is_empty());
}

#[tokio::test]
async fn with_id_fetches_entity_for_editing() {
    let (api, mut form) = person_form();
    let id = api.seed(Person::new("Ann", 30, "a@x.com")).await;

    form.init(Some(id)).await.expect("init");
    assert_eq!(form.state(), FormState::EditReady);
    assert_eq!(form.mode(), FormMode::Edit(id));
    assert!(form.is_edit());
    assert_eq!(form.entity().name, "Ann");
}

#[tokio::test]
async fn create_save_returns_list_route_and_server_entity() {
    let (api, mut form) = person_form();
    form.init(None).await.expect("init");
    *form.entity_mut() = Person::new("Ann", 30, "a@x.com");

    let outcome = form.save().await.expect("save");
    assert_eq!(outcome.mode, FormMode::Create);
    assert_eq!(outcome.next, Route::list_of::<Person>());
    assert_eq!(outcome.next.path(), "/people");
    assert!(outcome.entity.id.is_persisted());
    assert_eq!(form.entity(), &outcome.entity);
    assert_eq!(form.state(), FormState::Done);
    assert_eq!(api.call_log().await, vec![Operation::Create]);
}

#[tokio::test]
async fn edit_save_dispatches_update() {
    let (api, mut form) = person_form();
    let id = api.seed(Person::new("Ann", 30, "a@x.com")).await;
    form.init(Some(id)).await.expect("init");
    form.entity_mut().age = 31;

    let outcome = form.save().await.expect("save");
    assert_eq!(outcome.mode, FormMode::Edit(id));
    assert_eq!(api.stored(id).await.expect("stored").age, 31);
    assert_eq!(api.call_log().await, vec![Operation::Get, Operation::Update]);
}

#[tokio::test]
async fn failed_load_moves_to_error_and_blocks_save() {
    let (api, mut form) = person_form();

    let err = form.init(Some(EntityId(404))).await.expect_err("load should fail");
    assert!(err.is_not_found());
    assert_eq!(form.state(), FormState::Error);

    let err = form.save().await.expect_err("save should be refused");
    assert!(matches!(
        err,
        ClientError::NotReady {
            state: FormState::Error
        }
    ));
    assert_eq!(api.call_log().await, vec![Operation::Get]);
}

#[tokio::test]
async fn failed_save_keeps_entity_and_allows_another_attempt() {
    let (api, mut form) = person_form();
    form.init(None).await.expect("init");
    *form.entity_mut() = Person::new("Ann", 30, "not-an-email");
    api.fail_next(Operation::Create, rejected_email()).await;

    let err = form.save().await.expect_err("save should fail");
    assert_eq!(
        err.field_errors().and_then(|fields| fields.get("email")).map(Vec::len),
        Some(1)
    );
    assert_eq!(form.state(), FormState::Error);
    assert_eq!(form.entity().email, "not-an-email");
    assert!(form.entity().id.is_unsaved());

    form.entity_mut().email = "a@x.com".to_string();
    let outcome = form.save().await.expect("second attempt");
    assert_eq!(outcome.entity.email, "a@x.com");
}

#[tokio::test]
async fn save_is_refused_before_init_and_after_done() {
    let (api, mut form) = person_form();
    let err = form.save().await.expect_err("uninitialized");
    assert!(matches!(
        err,
        ClientError::NotReady {
            state: FormState::Uninitialized
        }
    ));

    form.init(None).await.expect("init");
    form.save().await.expect("save");
    let err = form.save().await.expect_err("already done");
    assert!(matches!(
        err,
        ClientError::NotReady {
            state: FormState::Done
        }
    ));
    assert_eq!(api.call_log().await, vec![Operation::Create]);
}

#[tokio::test]
async fn transport_failure_on_update_surfaces_unchanged() {
    let (api, mut form) = person_form();
    let id = api.seed(Person::new("Ann", 30, "a@x.com")).await;
    form.init(Some(id)).await.expect("init");
    form.entity_mut().name = "Anne".to_string();
    api.fail_next(Operation::Update, transport_failure("people", Operation::Update))
        .await;

    let err = form.save().await.expect_err("update should fail");
    assert!(err.is_transport());
    assert_eq!(form.entity().name, "Anne");
    assert_eq!(api.stored(id).await.expect("stored").name, "Ann");
}
