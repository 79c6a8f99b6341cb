use iced::widget::image::Handle;
use iced::widget::{button, column, container, row, text, Column, Image};
use iced::{Alignment, Element, Length, Task, Theme};
use tracing_subscriber::EnvFilter;

mod camera;
mod config;
mod markup;
mod state;
mod ui;
mod upload;

use camera::{CameraSurface, Permission};
use config::{Config, ConfigError};
use state::data::CapturedPhoto;
use state::session::{Phase, Session};
use upload::{SpeciesClient, UploadCoordinator, UploadError, UploadOutcome, UploadTicket};

/// Why the application could not start
#[derive(Debug, thiserror::Error)]
enum StartupError {
    #[error("configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("HTTP client: {0}")]
    Client(#[from] UploadError),
}

/// Main application state
struct SpecimenCam {
    /// Camera, photo, result and the live upload
    session: Session,
    /// Decoded preview of the current photo
    preview: Option<Handle>,
    /// Status message to display to the user
    status: String,
}

/// Application messages (events)
#[derive(Debug, Clone)]
enum Message {
    /// Camera access was checked
    PermissionResolved(Permission),
    /// User asked for camera access again
    RequestPermission,
    /// User pressed the shutter
    Capture,
    /// Background development of the still finished
    Captured(Result<CapturedPhoto, String>),
    /// An upload settled (possibly a superseded one)
    UploadFinished(UploadTicket, UploadOutcome),
    /// User discarded the current result
    Reset,
}

impl SpecimenCam {
    /// Create a new instance of the application
    fn new(config: Config, client: SpeciesClient) -> (Self, Task<Message>) {
        tracing::info!("🎨 Specimen Cam initialized, endpoint {}", client.endpoint());

        let camera = CameraSurface::new(config.capture_dir.clone());
        let session = Session::new(camera, UploadCoordinator::new(client));

        (
            SpecimenCam {
                session,
                preview: None,
                status: "Checking camera access...".to_string(),
            },
            Task::perform(
                camera::request_permission(config.capture_dir),
                Message::PermissionResolved,
            ),
        )
    }

    /// Handle application messages and update state
    fn update(&mut self, message: Message) -> Task<Message> {
        match message {
            Message::PermissionResolved(permission) => {
                self.session.camera_mut().set_permission(permission);
                self.status = match permission {
                    Permission::Granted => "Ready.".to_string(),
                    _ => "Camera permission required".to_string(),
                };
                Task::none()
            }
            Message::RequestPermission => {
                let capture_dir = self.session.camera().capture_dir().to_path_buf();
                Task::perform(
                    camera::request_permission(capture_dir),
                    Message::PermissionResolved,
                )
            }
            Message::Capture => {
                if !self.session.can_capture() {
                    return Task::none();
                }

                // Dismissing the picker is not a capture
                let Some(frame) = self.session.camera_mut().open_shutter() else {
                    return Task::none();
                };

                if let Err(e) = self.session.begin_capture() {
                    tracing::warn!("⚠️  {}", e);
                    return Task::none();
                }

                self.preview = None;
                self.status = "Capturing...".to_string();
                let capture_dir = self.session.camera().capture_dir().to_path_buf();

                Task::perform(camera::develop(frame, capture_dir), |developed| {
                    Message::Captured(developed.map_err(|e| e.to_string()))
                })
            }
            Message::Captured(Ok(photo)) => {
                let preview = Handle::from_bytes(photo.preview_jpeg.clone());

                match self.session.start_upload(photo) {
                    Ok((ticket, upload)) => {
                        self.preview = Some(preview);
                        self.status = "Identifying...".to_string();
                        Task::perform(upload, move |outcome| {
                            Message::UploadFinished(ticket, outcome)
                        })
                    }
                    Err(e) => {
                        tracing::warn!("⚠️  {}", e);
                        Task::none()
                    }
                }
            }
            Message::Captured(Err(reason)) => {
                if let Err(e) = self.session.capture_failed(&reason) {
                    tracing::warn!("⚠️  {}", e);
                }
                self.status = String::new();
                Task::none()
            }
            Message::UploadFinished(ticket, outcome) => {
                if self.session.finish_upload(ticket, outcome) {
                    if let Some(result) = self.session.result() {
                        tracing::info!(
                            "Showing {}: {}",
                            result.common_name,
                            markup::plain_text(&result.description)
                        );
                    }
                    self.status = String::new();
                }
                Task::none()
            }
            Message::Reset => {
                match self.session.reset() {
                    Ok(()) => {
                        self.preview = None;
                        self.status = "Ready.".to_string();
                    }
                    Err(e) => tracing::warn!("⚠️  {}", e),
                }
                Task::none()
            }
        }
    }

    /// Build the user interface
    fn view(&self) -> Element<Message> {
        let content: Column<Message> = match self.session.camera().permission() {
            // Still asking: nothing to show yet
            Permission::Undetermined => column![],
            Permission::Denied => column![
                text("Camera permission required").size(20),
                button("Grant Permission")
                    .on_press(Message::RequestPermission)
                    .padding(10),
            ],
            Permission::Granted => self.camera_screen(),
        }
        .spacing(20)
        .padding(40)
        .align_x(Alignment::Center);

        container(content)
            .width(Length::Fill)
            .height(Length::Fill)
            .center_x(Length::Fill)
            .center_y(Length::Fill)
            .into()
    }

    fn camera_screen(&self) -> Column<Message> {
        let viewfinder: Element<Message> = match &self.preview {
            Some(handle) => Image::new(handle.clone())
                .width(Length::Fixed(300.0))
                .height(Length::Fixed(400.0))
                .into(),
            None => container(text(self.viewfinder_caption()).size(14))
                .width(Length::Fixed(300.0))
                .height(Length::Fixed(400.0))
                .center_x(Length::Fixed(300.0))
                .center_y(Length::Fixed(400.0))
                .style(container::bordered_box)
                .into(),
        };

        let shutter = button("Take Photo")
            .on_press_maybe(self.session.can_capture().then_some(Message::Capture))
            .padding(10);
        let reset = button("Reset")
            .on_press_maybe((self.session.phase() == Phase::Showing).then_some(Message::Reset))
            .padding(10);

        let mut screen = column![viewfinder];

        if let Some(photo) = self.session.photo() {
            screen = screen.push(
                text(format!(
                    "Captured {} · {}×{}",
                    photo.captured_at.with_timezone(&chrono::Local).format("%H:%M:%S"),
                    photo.width,
                    photo.height
                ))
                .size(12),
            );
        }

        screen = screen.push(row![shutter, reset].spacing(10));

        if let Some(result) = self.session.result() {
            screen = screen.push(ui::ResultCard::new(result).view());
        }

        screen.push(text(&self.status).size(14))
    }

    fn viewfinder_caption(&self) -> String {
        match (self.session.phase(), self.session.camera().last_frame()) {
            (Phase::Capturing, Some(frame)) => format!(
                "Developing {}",
                frame.file_name().unwrap_or_default().to_string_lossy()
            ),
            _ => "Camera live".to_string(),
        }
    }

    /// Set the application theme
    fn theme(&self) -> Theme {
        Theme::Dark
    }
}

fn startup() -> Result<(Config, SpeciesClient), StartupError> {
    let config = Config::load()?;
    let client = SpeciesClient::new(&config)?;
    tracing::debug!("Configuration: {:?}", config);
    Ok((config, client))
}

fn main() -> iced::Result {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let (config, client) = match startup() {
        Ok(ready) => ready,
        Err(e) => {
            tracing::error!("❌ Cannot start: {}", e);
            std::process::exit(2);
        }
    };

    iced::application("Specimen Cam", SpecimenCam::update, SpecimenCam::view)
        .theme(SpecimenCam::theme)
        .centered()
        .run_with(move || SpecimenCam::new(config, client))
}
