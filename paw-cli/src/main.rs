use std::fs;
use std::path::{Path, PathBuf};
use std::process;

use anyhow::{Context, Result, anyhow, bail};
use clap::{Parser, Subcommand, ValueEnum};
use paw_client::visibility::{FEED_PAGE_STEP, FeedSort, feed_window, view_post};
use paw_client::{
    Category, FileTokenStore, ImageUpload, LoginRequest, NewComment, NewPost, NutritionRequest,
    PawClient, PawClientError, ProfileUpdate, RegisterRequest, Session,
};
use tracing::debug;
use tracing_subscriber::{EnvFilter, fmt};

mod render;

const SESSION_FILE: &str = ".paw_session";

#[derive(Debug, Parser)]
#[command(name = "paw-cli", version, about = "CLI клиент для PawPedia")]
struct Cli {
    /// Базовый URL API (по умолчанию `PAW_API_URL` или http://localhost:5000/api).
    #[arg(long, global = true)]
    api: Option<String>,

    /// Файл с сохранённой сессией.
    #[arg(long, global = true, default_value = SESSION_FILE)]
    session_file: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum CategoryArg {
    Tip,
    Story,
}

impl From<CategoryArg> for Category {
    fn from(value: CategoryArg) -> Self {
        match value {
            CategoryArg::Tip => Category::Tip,
            CategoryArg::Story => Category::Story,
        }
    }
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Регистрация пользователя.
    Register {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
        #[arg(long)]
        phone: Option<String>,
        #[arg(long)]
        address: Option<String>,
    },
    /// Вход пользователя.
    Login {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    /// Выход: удаляет сохранённую сессию.
    Logout,
    /// Профиль текущего пользователя.
    Me,
    /// Обновление профиля; передаются только указанные поля.
    UpdateMe {
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        phone: Option<String>,
        #[arg(long)]
        address: Option<String>,
    },
    /// Лента постов.
    Posts {
        /// most-upvoted или most-recent.
        #[arg(long, default_value = "most-upvoted")]
        sort: FeedSort,
        /// Сколько страниц ленты показать.
        #[arg(long, default_value_t = 1)]
        pages: usize,
        /// Показывать длинные посты целиком.
        #[arg(long)]
        expand: bool,
    },
    /// Один пост целиком, с комментариями.
    Show {
        #[arg(long)]
        id: String,
    },
    /// Мои посты (требует токен).
    MyPosts,
    /// Создание поста (требует токен).
    Create {
        #[arg(long)]
        title: String,
        #[arg(long)]
        content: String,
        #[arg(long, value_enum, default_value = "tip")]
        category: CategoryArg,
        #[arg(long)]
        premium: bool,
        /// Путь к изображению (png, jpg, gif, webp).
        #[arg(long)]
        image: Option<PathBuf>,
    },
    /// Удаление поста (требует токен).
    Delete {
        #[arg(long)]
        id: String,
    },
    /// Голос "за".
    Upvote {
        #[arg(long)]
        id: String,
    },
    /// Голос "против".
    Downvote {
        #[arg(long)]
        id: String,
    },
    /// Подписка на автора поста.
    Follow {
        #[arg(long)]
        id: String,
    },
    /// Комментарий к посту.
    Comment {
        #[arg(long)]
        post_id: String,
        #[arg(long)]
        content: String,
    },
    /// Оплата платного поста: печатает ссылку на страницу оплаты.
    Pay {
        #[arg(long)]
        id: String,
    },
    /// Все пользователи (администратор).
    Users,
    /// Удаление пользователя (администратор).
    DeleteUser {
        #[arg(long)]
        id: String,
    },
    /// Сводка для панели администратора.
    Dashboard,
    /// PDF с планом питания питомца.
    NutritionPdf {
        #[arg(long)]
        pet_type: String,
        #[arg(long)]
        age: u32,
        #[arg(long)]
        weight: f64,
        #[arg(long, default_value = "nutrition.pdf")]
        out: PathBuf,
    },
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("Ошибка: {err}");
        process::exit(1);
    }
}

fn init_logging() {
    // RUST_LOG важнее LOG_LEVEL; по умолчанию CLI пишет только предупреждения.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = std::env::var("LOG_LEVEL").unwrap_or_else(|_| "warn".to_string());
        EnvFilter::new(level)
    });
    let _ = fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .compact()
        .try_init();
}

async fn run() -> Result<()> {
    dotenvy::dotenv().ok();
    init_logging();

    let cli = Cli::parse();

    let api_url = resolve_api_url(cli.api, std::env::var("PAW_API_URL").ok());
    debug!(api = %api_url, session_file = %cli.session_file.display(), "cli configured");
    let session = Session::new(FileTokenStore::new(&cli.session_file));
    let client = PawClient::new(api_url, session).map_err(map_client_error)?;

    match cli.command {
        Command::Register {
            name,
            email,
            password,
            phone,
            address,
        } => {
            let auth = client
                .register(&RegisterRequest {
                    name,
                    email,
                    password,
                    phone,
                    address,
                })
                .await
                .map_err(map_client_error)?;
            print!("{}", render::auth("Регистрация успешна", &auth));
        }
        Command::Login { email, password } => {
            let auth = client
                .login(&LoginRequest { email, password })
                .await
                .map_err(map_client_error)?;
            print!("{}", render::auth("Вход выполнен", &auth));
        }
        Command::Logout => {
            client.logout().map_err(map_client_error)?;
            println!("Сессия завершена");
        }
        Command::Me => {
            let user = client.current_user().await.map_err(map_client_error)?;
            print!("{}", render::user(&user));
        }
        Command::UpdateMe {
            name,
            email,
            phone,
            address,
        } => {
            let update = ProfileUpdate {
                name,
                email,
                phone,
                address,
            };
            if update.name.is_none()
                && update.email.is_none()
                && update.phone.is_none()
                && update.address.is_none()
            {
                bail!("укажите хотя бы одно поле для обновления");
            }
            let user = client
                .update_profile(&update)
                .await
                .map_err(map_client_error)?;
            println!("Профиль обновлён");
            print!("{}", render::user(&user));
        }
        Command::Posts {
            sort,
            pages,
            expand,
        } => {
            let posts = client.posts().await.map_err(map_client_error)?;
            let viewer = client.session().viewer_id();
            let visible = pages.max(1).saturating_mul(FEED_PAGE_STEP);

            let window = feed_window(&posts, sort, visible);
            println!("Постов: {} из {}", window.len(), posts.len());
            for post in window {
                print!(
                    "{}",
                    render::post_view(&view_post(post, viewer.as_deref(), expand))
                );
            }
            if visible < posts.len() {
                println!("Ещё посты: --pages {}", pages.max(1) + 1);
            }
        }
        Command::Show { id } => {
            let posts = client.posts().await.map_err(map_client_error)?;
            let post = posts
                .iter()
                .find(|post| post.id == id)
                .ok_or_else(|| anyhow!("пост не найден: id={id}"))?;
            let viewer = client.session().viewer_id();
            print!(
                "{}",
                render::post_view(&view_post(post, viewer.as_deref(), true))
            );
            print!("{}", render::comments(&post.comments));
        }
        Command::MyPosts => {
            let posts = client.my_posts().await.map_err(map_client_error)?;
            println!("Моих постов: {}", posts.len());
            for post in posts.iter() {
                println!("{}", render::post_summary(post));
            }
        }
        Command::Create {
            title,
            content,
            category,
            premium,
            image,
        } => {
            let image = image.as_deref().map(load_image).transpose()?;
            let post = client
                .create_post(&NewPost {
                    title,
                    content,
                    category: category.into(),
                    is_premium: premium,
                    image,
                })
                .await
                .map_err(map_client_error)?;
            println!("Пост создан");
            println!("{}", render::post_summary(&post));
        }
        Command::Delete { id } => {
            client.delete_post(&id).await.map_err(map_client_error)?;
            println!("Пост удалён: id={id}");
        }
        Command::Upvote { id } => {
            client.upvote(&id).await.map_err(map_client_error)?;
            println!("Голос учтён: id={id}");
        }
        Command::Downvote { id } => {
            client.downvote(&id).await.map_err(map_client_error)?;
            println!("Голос учтён: id={id}");
        }
        Command::Follow { id } => {
            client.follow_author(&id).await.map_err(map_client_error)?;
            println!("Вы подписались на автора поста id={id}");
        }
        Command::Comment { post_id, content } => {
            let comment = client
                .create_comment(&NewComment { post_id, content })
                .await
                .map_err(map_client_error)?;
            println!("Комментарий добавлен: id={}", comment.id);
        }
        Command::Pay { id } => {
            let payment = client.pay_for_post(&id).await.map_err(map_client_error)?;
            println!("Оплатите доступ по ссылке:");
            println!("{}", payment.payment_url);
        }
        Command::Users => {
            let users = client.all_users().await.map_err(map_client_error)?;
            print!("{}", render::users(&users));
        }
        Command::DeleteUser { id } => {
            client.delete_user(&id).await.map_err(map_client_error)?;
            println!("Пользователь удалён: id={id}");
        }
        Command::Dashboard => {
            let totals = client.dashboard_totals().await.map_err(map_client_error)?;
            print!("{}", render::dashboard(&totals));
        }
        Command::NutritionPdf {
            pet_type,
            age,
            weight,
            out,
        } => {
            let pdf = client
                .generate_nutrition_pdf(&NutritionRequest {
                    pet_type,
                    age,
                    weight,
                })
                .await
                .map_err(map_client_error)?;
            fs::write(&out, &pdf)
                .with_context(|| format!("не удалось записать {}", out.display()))?;
            println!("PDF сохранён: {} ({} байт)", out.display(), pdf.len());
        }
    }

    Ok(())
}

fn resolve_api_url(flag: Option<String>, env: Option<String>) -> String {
    let raw = flag
        .or(env)
        .map(|url| url.trim().to_string())
        .filter(|url| !url.is_empty())
        .unwrap_or_else(|| paw_client::DEFAULT_API_URL.to_string());
    normalize_api_url(raw)
}

fn normalize_api_url(url: String) -> String {
    let url = url.trim_end_matches('/').to_string();
    if url.starts_with("http://") || url.starts_with("https://") {
        return url;
    }

    format!("http://{url}")
}

fn image_mime(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "gif" => Some("image/gif"),
        "webp" => Some("image/webp"),
        _ => None,
    }
}

fn load_image(path: &Path) -> Result<ImageUpload> {
    let mime = image_mime(path)
        .ok_or_else(|| anyhow!("неподдерживаемый формат изображения: {}", path.display()))?;
    let bytes =
        fs::read(path).with_context(|| format!("не удалось прочитать {}", path.display()))?;
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("image")
        .to_string();

    Ok(ImageUpload {
        file_name,
        mime: mime.to_string(),
        bytes,
    })
}

fn map_client_error(err: PawClientError) -> anyhow::Error {
    let message = match err {
        PawClientError::MissingToken => {
            "требуется авторизация: выполните `paw-cli login ...` или `paw-cli register ...`"
                .to_string()
        }
        PawClientError::Api { status: 401, .. } => {
            "сессия недействительна: выполните `paw-cli login ...` заново".to_string()
        }
        PawClientError::Api { message, .. } => message,
        PawClientError::Network(err) => format!("сервер недоступен: {err}"),
        PawClientError::Decode(err) => format!("неожиданный ответ сервера: {err}"),
        PawClientError::Validation(message) => format!("некорректные данные: {message}"),
        PawClientError::Storage(err) => format!("ошибка файла сессии: {err}"),
    };
    anyhow!(message)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_flag_wins_over_env() {
        let url = resolve_api_url(
            Some("http://flag.test/api".to_string()),
            Some("http://env.test/api".to_string()),
        );
        assert_eq!(url, "http://flag.test/api");
    }

    #[test]
    fn api_url_defaults_and_normalizes() {
        assert_eq!(resolve_api_url(None, None), paw_client::DEFAULT_API_URL);
        assert_eq!(
            resolve_api_url(None, Some("localhost:5000/api/".to_string())),
            "http://localhost:5000/api"
        );
        assert_eq!(
            resolve_api_url(Some("  ".to_string()), None),
            paw_client::DEFAULT_API_URL
        );
    }

    #[test]
    fn image_mime_follows_extension() {
        assert_eq!(image_mime(Path::new("cat.PNG")), Some("image/png"));
        assert_eq!(image_mime(Path::new("dog.jpeg")), Some("image/jpeg"));
        assert_eq!(image_mime(Path::new("notes.txt")), None);
        assert_eq!(image_mime(Path::new("noext")), None);
    }

    #[test]
    fn missing_token_points_to_login() {
        let err = map_client_error(PawClientError::MissingToken);
        assert!(err.to_string().contains("paw-cli login"));
    }

    #[test]
    fn api_error_message_is_shown_verbatim() {
        let err = map_client_error(PawClientError::Api {
            status: 400,
            message: "Failed to create post".to_string(),
        });
        assert_eq!(err.to_string(), "Failed to create post");
    }

    #[test]
    fn cli_parses_feed_options() {
        let cli = Cli::try_parse_from(["paw-cli", "posts", "--sort", "most-recent", "--pages", "2"])
            .expect("args must parse");
        match cli.command {
            Command::Posts { sort, pages, .. } => {
                assert_eq!(sort, FeedSort::MostRecent);
                assert_eq!(pages, 2);
            }
            other => panic!("unexpected command: {other:?}"),
        }
        assert_eq!(cli.session_file, PathBuf::from(SESSION_FILE));
    }
}
