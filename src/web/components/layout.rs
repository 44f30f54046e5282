use maud::{html, Markup, DOCTYPE};

use crate::models::Role;

/// Base HTML layout with Tailwind CSS
pub fn base(title: &str, content: Markup) -> Markup {
    html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="utf-8";
                meta name="viewport" content="width=device-width, initial-scale=1";
                title { (title) " - Linkdesk" }

                // Tailwind CSS (CDN build)
                script src="https://cdn.tailwindcss.com" {}

                script {
                    r#"
                    tailwind.config = {
                        theme: {
                            extend: {
                                colors: {
                                    primary: '#2E6F40',
                                    secondary: '#68BA7F',
                                }
                            }
                        }
                    }
                    "#
                }
            }
            body class="bg-gray-50 min-h-screen" {
                (content)
            }
        }
    }
}

/// Sidebar entries shown on every authenticated page
const NAV_ITEMS: &[(&str, &str, &str)] = &[
    ("dashboard", "/dashboard", "My Organizations"),
    ("members", "/member-organizations", "Member Organizations"),
    ("bulk", "/bulk-upload", "Bulk Upload"),
];

/// Authenticated page shell: top bar with the user, sidebar navigation, content
pub fn app_shell(user_email: &str, active: &str, content: Markup) -> Markup {
    html! {
        nav class="bg-white shadow-sm border-b border-gray-200" {
            div class="max-w-7xl mx-auto px-4 sm:px-6 lg:px-8" {
                div class="flex justify-between h-16" {
                    div class="flex items-center" {
                        a href="/dashboard" class="text-2xl font-bold text-primary" {
                            "Linkdesk"
                        }
                    }

                    div class="flex items-center" {
                        div class="h-8 w-8 rounded-full bg-primary flex items-center justify-center text-white font-medium" {
                            (user_email.chars().next().unwrap_or('U').to_uppercase())
                        }
                        span class="ml-3 text-sm text-gray-700" { (user_email) }
                        form action="/logout" method="post" class="ml-4" {
                            button
                                type="submit"
                                class="text-sm text-gray-500 hover:text-gray-700" {
                                "Logout"
                            }
                        }
                    }
                }
            }
        }
        div class="max-w-7xl mx-auto flex" {
            aside class="w-56 shrink-0 py-8 pl-4 sm:pl-6 lg:pl-8" {
                ul class="space-y-1" {
                    @for (key, href, label) in NAV_ITEMS {
                        li {
                            @if *key == active {
                                a href=(href) class="block rounded-md px-3 py-2 text-sm font-medium bg-primary text-white" { (label) }
                            } @else {
                                a href=(href) class="block rounded-md px-3 py-2 text-sm font-medium text-gray-700 hover:bg-gray-100" { (label) }
                            }
                        }
                    }
                }
            }
            main class="flex-1 min-w-0" {
                (container(content))
            }
        }
    }
}

/// Container for main content
pub fn container(content: Markup) -> Markup {
    html! {
        div class="px-4 sm:px-6 lg:px-8 py-8" {
            (content)
        }
    }
}

/// Card component
pub fn card(title: &str, content: Markup) -> Markup {
    html! {
        div class="bg-white overflow-hidden shadow rounded-lg" {
            div class="px-4 py-5 sm:p-6" {
                h3 class="text-lg leading-6 font-medium text-gray-900 mb-4" {
                    (title)
                }
                (content)
            }
        }
    }
}

/// Button component
pub fn button(text: &str, button_type: &str, extra_classes: &str) -> Markup {
    let base_classes = "inline-flex justify-center py-2 px-4 border border-transparent shadow-sm text-sm font-medium rounded-md focus:outline-none focus:ring-2 focus:ring-offset-2";

    let color_classes = match button_type {
        "secondary" => "text-white bg-gray-600 hover:bg-gray-700 focus:ring-gray-500",
        "danger" => "text-white bg-red-600 hover:bg-red-700 focus:ring-red-500",
        _ => "text-white bg-primary hover:bg-green-800 focus:ring-primary",
    };

    html! {
        button
            type="submit"
            class=(format!("{} {} {}", base_classes, color_classes, extra_classes)) {
            (text)
        }
    }
}

/// Alert message component
pub fn alert(message: &str, alert_type: &str) -> Markup {
    let (bg_class, text_class) = match alert_type {
        "success" => ("bg-green-50 border-green-200", "text-green-800"),
        "error" => ("bg-red-50 border-red-200", "text-red-800"),
        "warning" => ("bg-yellow-50 border-yellow-200", "text-yellow-800"),
        _ => ("bg-blue-50 border-blue-200", "text-blue-800"),
    };

    html! {
        div class=(format!("rounded-md p-4 mb-4 border {}", bg_class)) role="alert" {
            p class=(format!("text-sm font-medium {}", text_class)) {
                (message)
            }
        }
    }
}

pub fn role_badge(role: Role) -> Markup {
    let (classes, label) = match role {
        Role::Admin => ("bg-green-100 text-green-800", "Admin"),
        Role::Editor => ("bg-blue-100 text-blue-800", "Editor"),
        Role::Viewer => ("bg-gray-100 text-gray-800", "Viewer"),
    };

    html! {
        span class=(format!("inline-flex items-center px-2.5 py-0.5 rounded-full text-xs font-medium {}", classes)) {
            (label)
        }
    }
}

/// Centered single-message page (errors, confirmations)
pub fn message_page(title: &str, message: &str, alert_type: &str, link: (&str, &str)) -> Markup {
    base(
        title,
        html! {
            div class="min-h-screen flex items-center justify-center bg-gray-50" {
                div class="max-w-md w-full" {
                    h2 class="text-2xl font-bold text-gray-900 mb-4 text-center" { (title) }
                    (alert(message, alert_type))
                    a href=(link.0) class="text-primary hover:text-green-700" {
                        (link.1)
                    }
                }
            }
        },
    )
}
