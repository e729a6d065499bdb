use serde::Serialize;

use crate::forms::{CategoryForm, FormErrors, PageForm, UserForm, UserProfileForm};
use crate::store::{Category, Page};

#[derive(Serialize)]
pub struct IndexContext {
    pub categories: Vec<Category>,
    pub pages: Vec<Page>,
    pub visits: u32,
}

#[derive(Serialize)]
pub struct AboutContext {
    #[serde(rename = "aboutmessage")]
    pub about_message: String,
    pub visits: u32,
}

/// Both fields are `None` when the slug matched nothing.
#[derive(Serialize)]
pub struct CategoryContext {
    pub category: Option<Category>,
    pub pages: Option<Vec<Page>>,
}

#[derive(Serialize)]
pub struct AddCategoryContext {
    pub form: CategoryForm,
    pub errors: FormErrors,
}

#[derive(Serialize)]
pub struct AddPageContext {
    pub form: PageForm,
    pub category: Option<Category>,
    pub errors: FormErrors,
}

#[derive(Serialize)]
pub struct RegisterContext {
    pub user_form: UserForm,
    pub user_errors: FormErrors,
    pub profile_form: UserProfileForm,
    pub profile_errors: FormErrors,
    pub registered: bool,
}

#[derive(Serialize)]
pub struct LoginContext {}
